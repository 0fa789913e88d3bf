//! Roblox public server list integration
//!
//! Supplies the job-id pool with the public servers of one place.
//!
//! ## API Reference
//!
//! Endpoint: https://games.roblox.com/v1/games/{placeId}/servers/Public?limit={n}&cursor={c}
//! Returns: `{ "data": [{ "id": "..." , ... }], "nextPageCursor": "..." | null }`
//!
//! A 429 response is reported as `FetchError::RateLimited` so the cache can
//! apply its partial-save policy.

use super::error::FetchError;
use super::job_cache::{PageSource, ServerPage};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const ROBLOX_GAMES_API: &str = "https://games.roblox.com";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerListResponse {
    #[serde(default)]
    pub data: Vec<ServerEntry>,
    #[serde(rename = "nextPageCursor")]
    pub next_page_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerEntry {
    pub id: String,
    #[serde(default)]
    pub playing: Option<u32>,
    #[serde(rename = "maxPlayers", default)]
    pub max_players: Option<u32>,
}

impl ServerEntry {
    /// Server has no free slot; unknown counts are treated as joinable
    pub fn is_full(&self) -> bool {
        matches!((self.playing, self.max_players), (Some(playing), Some(max)) if playing >= max)
    }
}

impl From<ServerListResponse> for ServerPage {
    /// Full servers are dropped; the cursor is kept so paging continues
    fn from(resp: ServerListResponse) -> Self {
        ServerPage {
            ids: resp
                .data
                .into_iter()
                .filter(|s| !s.is_full())
                .map(|s| s.id)
                .collect(),
            next_cursor: resp.next_page_cursor.filter(|c| !c.is_empty()),
        }
    }
}

pub struct RobloxServerSource {
    client: reqwest::Client,
    base_url: String,
    place_id: String,
    page_limit: u32,
}

impl RobloxServerSource {
    pub fn new(place_id: &str, page_limit: u32, timeout: Duration) -> Result<Self, FetchError> {
        Self::with_base_url(ROBLOX_GAMES_API, place_id, page_limit, timeout)
    }

    /// Point the source at another host (used by tests and proxies)
    pub fn with_base_url(
        base_url: &str,
        place_id: &str,
        page_limit: u32,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            place_id: place_id.to_string(),
            page_limit,
        })
    }

    pub fn servers_url(&self) -> String {
        format!("{}/v1/games/{}/servers/Public", self.base_url, self.place_id)
    }
}

#[async_trait]
impl PageSource for RobloxServerSource {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<ServerPage, FetchError> {
        let mut request = self
            .client
            .get(self.servers_url())
            .query(&[("limit", self.page_limit.to_string())]);

        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Transport(format!("Roblox API error: {}", status)));
        }

        let body = response.text().await?;
        let parsed: ServerListResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Format(e.to_string()))?;

        Ok(parsed.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_list() {
        let body = r#"{
            "previousPageCursor": null,
            "nextPageCursor": "abc123",
            "data": [
                {"id": "job-1", "maxPlayers": 8, "playing": 3, "fps": 59.9, "ping": 80},
                {"id": "job-2", "maxPlayers": 8, "playing": 7},
                {"id": "job-3"}
            ]
        }"#;

        let parsed: ServerListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data[0].playing, Some(3));

        let page: ServerPage = parsed.into();
        assert_eq!(page.ids, vec!["job-1", "job-2", "job-3"]);
        assert_eq!(page.next_cursor.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_full_servers_are_skipped() {
        let body = r#"{
            "nextPageCursor": "next",
            "data": [
                {"id": "full", "maxPlayers": 8, "playing": 8},
                {"id": "over", "maxPlayers": 8, "playing": 9},
                {"id": "open", "maxPlayers": 8, "playing": 2}
            ]
        }"#;

        let parsed: ServerListResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.data[0].is_full());

        let page: ServerPage = parsed.into();
        assert_eq!(page.ids, vec!["open"]);
        assert_eq!(page.next_cursor.as_deref(), Some("next"));
    }

    #[test]
    fn test_last_page_has_no_cursor() {
        let parsed: ServerListResponse =
            serde_json::from_str(r#"{"nextPageCursor": null, "data": []}"#).unwrap();
        let page: ServerPage = parsed.into();

        assert!(page.ids.is_empty());
        assert_eq!(page.next_cursor, None);
    }

    #[test]
    fn test_servers_url() {
        let source = RobloxServerSource::with_base_url(
            "http://localhost:9/",
            "42",
            100,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(source.servers_url(), "http://localhost:9/v1/games/42/servers/Public");
    }

    #[tokio::test]
    #[ignore] // Run only when testing with live API
    async fn test_fetch_first_page_live() {
        let source =
            RobloxServerSource::new("109983668079237", 10, Duration::from_secs(10)).unwrap();

        let result = source.fetch_page(None).await;
        assert!(matches!(result, Ok(_) | Err(FetchError::RateLimited)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Port 9 (discard) is not expected to serve HTTP locally
        let source = RobloxServerSource::with_base_url(
            "http://127.0.0.1:9",
            "1",
            10,
            Duration::from_millis(500),
        )
        .unwrap();

        assert!(matches!(source.fetch_page(None).await, Err(FetchError::Transport(_))));
    }
}
