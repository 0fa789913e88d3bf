//! Discord webhook integration
//!
//! One client serves both outbound paths:
//! - notifications: `POST {webhook}` to the channel bound to a category
//! - status report: `POST {webhook}?wait=true` to create the message (the
//!   response carries its id), then `PATCH {webhook}/messages/{id}` to edit it
//!
//! Embed layout follows the Discord execute-webhook payload.

use super::dispatcher::NotificationSink;
use super::error::DeliveryError;
use super::status::StatusChannel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    /// ISO-8601 timestamp shown by the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

impl EmbedField {
    pub fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: String,
}

pub struct DiscordWebhookClient {
    client: reqwest::Client,
    /// Webhook used for the status message, if any
    status_url: Option<String>,
}

impl DiscordWebhookClient {
    pub fn new(timeout: Duration, status_url: Option<String>) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, status_url })
    }

    fn status_url(&self) -> Result<&str, DeliveryError> {
        self.status_url
            .as_deref()
            .ok_or_else(|| DeliveryError::Transport("no status webhook configured".to_string()))
    }
}

fn check_status(status: reqwest::StatusCode) -> Result<(), DeliveryError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(DeliveryError::Status(status.as_u16()))
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhookClient {
    async fn send(&self, channel: &str, message: &WebhookMessage) -> Result<(), DeliveryError> {
        let response = self.client.post(channel).json(message).send().await?;
        check_status(response.status())
    }
}

#[async_trait]
impl StatusChannel for DiscordWebhookClient {
    async fn create(&self, message: &WebhookMessage) -> Result<String, DeliveryError> {
        let url = self.status_url()?;
        let response = self
            .client
            .post(url)
            .query(&[("wait", "true")])
            .json(message)
            .send()
            .await?;
        check_status(response.status())?;

        let created: CreatedMessage = response.json().await?;
        Ok(created.id)
    }

    async fn update(
        &self,
        message_id: &str,
        message: &WebhookMessage,
    ) -> Result<(), DeliveryError> {
        let url = format!("{}/messages/{}", self.status_url()?.trim_end_matches('/'), message_id);
        let response = self.client.patch(&url).json(message).send().await?;
        check_status(response.status())
    }
}
