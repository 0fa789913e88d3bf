//! Pipeline configuration from environment variables

use super::dispatcher::ChannelMap;
use super::error::ConfigError;
use super::job_cache::CachePolicy;
use super::rules::RuleTable;
use super::types::Category;
use super::counters::DEFAULT_THRESHOLDS;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PLACE_ID: &str = "109983668079237";

/// Configuration for the pipeline runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Roblox place whose public servers feed the job-id pool
    pub place_id: String,

    /// Servers requested per page
    pub page_limit: u32,

    /// Seconds a job-id refresh stays fresh
    pub cache_ttl_secs: i64,

    /// Refresh loop interval in seconds
    pub refresh_interval_secs: u64,

    /// Pause between page requests in milliseconds
    pub page_delay_ms: u64,

    /// Upper bound on pages per refresh
    pub max_pages: usize,

    /// Timeout applied to every outbound HTTP call
    pub http_timeout_secs: u64,

    /// Seconds a reporter stays active after its last batch
    pub presence_window_secs: i64,

    /// Status report interval in milliseconds
    pub status_interval_ms: u64,

    /// Active-reporter count that fills the status progress bar
    pub status_active_ceiling: usize,

    /// Webhook holding the status message (status loop disabled when unset)
    pub status_webhook_url: Option<String>,

    /// Notification webhook per category
    pub channels: ChannelMap,

    /// Cumulative counter thresholds
    pub counter_thresholds: Vec<u64>,

    /// Optional JSON rule table replacing the built-in one
    pub rules_path: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            place_id: DEFAULT_PLACE_ID.to_string(),
            page_limit: 100,
            cache_ttl_secs: 20,
            refresh_interval_secs: 10,
            page_delay_ms: 1_000,
            max_pages: 50,
            http_timeout_secs: 10,
            presence_window_secs: 60,
            status_interval_ms: 1_000,
            status_active_ceiling: 50,
            status_webhook_url: None,
            channels: ChannelMap::new(),
            counter_thresholds: DEFAULT_THRESHOLDS.to_vec(),
            rules_path: None,
        }
    }
}

const CHANNEL_VARS: [(&str, Category); 5] = [
    ("WEBHOOK_TIER_A", Category::TierA),
    ("WEBHOOK_TIER_B", Category::TierB),
    ("WEBHOOK_TIER_C", Category::TierC),
    ("WEBHOOK_SPECIAL_X", Category::SpecialX),
    ("WEBHOOK_HIGH_MAGNITUDE", Category::HighMagnitude),
];

impl PipelineConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `ROBLOX_PLACE_ID` (default: 109983668079237)
    /// - `SERVER_PAGE_LIMIT` (default: 100)
    /// - `JOB_CACHE_TTL_SECS` (default: 20)
    /// - `JOB_REFRESH_INTERVAL_SECS` (default: 10)
    /// - `PAGE_DELAY_MS` (default: 1000)
    /// - `MAX_PAGES` (default: 50)
    /// - `HTTP_TIMEOUT_SECS` (default: 10)
    /// - `PRESENCE_WINDOW_SECS` (default: 60)
    /// - `STATUS_INTERVAL_MS` (default: 1000)
    /// - `STATUS_ACTIVE_CEILING` (default: 50)
    /// - `STATUS_WEBHOOK_URL` (optional)
    /// - `WEBHOOK_TIER_A` / `_TIER_B` / `_TIER_C` / `_SPECIAL_X` / `_HIGH_MAGNITUDE` (optional)
    /// - `COUNTER_THRESHOLDS` (comma-separated, default: 100000000,50000000,30000000)
    /// - `RULES_PATH` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build configuration from any variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut channels = ChannelMap::new();
        for (var, category) in CHANNEL_VARS {
            if let Some(url) = non_empty(var) {
                channels.insert(category, url);
            }
        }

        let counter_thresholds = match non_empty("COUNTER_THRESHOLDS") {
            Some(raw) => parse_thresholds(&raw)?,
            None => defaults.counter_thresholds,
        };

        let config = Self {
            place_id: non_empty("ROBLOX_PLACE_ID").unwrap_or(defaults.place_id),
            page_limit: parse_or(&non_empty, "SERVER_PAGE_LIMIT", defaults.page_limit)?,
            cache_ttl_secs: parse_or(&non_empty, "JOB_CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            refresh_interval_secs: parse_or(
                &non_empty,
                "JOB_REFRESH_INTERVAL_SECS",
                defaults.refresh_interval_secs,
            )?,
            page_delay_ms: parse_or(&non_empty, "PAGE_DELAY_MS", defaults.page_delay_ms)?,
            max_pages: parse_or(&non_empty, "MAX_PAGES", defaults.max_pages)?,
            http_timeout_secs: parse_or(
                &non_empty,
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout_secs,
            )?,
            presence_window_secs: parse_or(
                &non_empty,
                "PRESENCE_WINDOW_SECS",
                defaults.presence_window_secs,
            )?,
            status_interval_ms: parse_or(
                &non_empty,
                "STATUS_INTERVAL_MS",
                defaults.status_interval_ms,
            )?,
            status_active_ceiling: parse_or(
                &non_empty,
                "STATUS_ACTIVE_CEILING",
                defaults.status_active_ceiling,
            )?,
            status_webhook_url: non_empty("STATUS_WEBHOOK_URL"),
            channels,
            counter_thresholds,
            rules_path: non_empty("RULES_PATH"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("SERVER_PAGE_LIMIT", self.page_limit as u64),
            ("JOB_REFRESH_INTERVAL_SECS", self.refresh_interval_secs),
            ("MAX_PAGES", self.max_pages as u64),
            ("HTTP_TIMEOUT_SECS", self.http_timeout_secs),
            ("STATUS_INTERVAL_MS", self.status_interval_ms),
        ];
        for (var, value) in positive {
            if value == 0 {
                return Err(invalid(var, "must be greater than zero"));
            }
        }

        if self.cache_ttl_secs < 0 {
            return Err(invalid("JOB_CACHE_TTL_SECS", "must not be negative"));
        }
        if self.presence_window_secs < 0 {
            return Err(invalid("PRESENCE_WINDOW_SECS", "must not be negative"));
        }

        let urls = self.channels.values().chain(self.status_webhook_url.iter());
        for url in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(invalid(
                    "WEBHOOK_*",
                    "webhook URLs must start with http:// or https://",
                ));
            }
        }

        Ok(())
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            ttl_secs: self.cache_ttl_secs,
            page_delay: Duration::from_millis(self.page_delay_ms),
            fetch_timeout: self.http_timeout(),
            max_pages: self.max_pages,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Rule table from `RULES_PATH`, or the built-in one
    pub fn load_rules(&self) -> Result<RuleTable, ConfigError> {
        match &self.rules_path {
            Some(path) => Ok(RuleTable::from_file(path)?),
            None => Ok(RuleTable::default()),
        }
    }
}

fn invalid(var: &str, msg: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        msg: msg.to_string(),
    }
}

fn parse_or<T, F>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) => raw
            .parse()
            .map_err(|_| invalid(var, &format!("'{}' is not a valid number", raw))),
        None => Ok(default),
    }
}

fn parse_thresholds(raw: &str) -> Result<Vec<u64>, ConfigError> {
    let thresholds = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.replace('_', "").parse::<u64>().map_err(|_| {
                invalid("COUNTER_THRESHOLDS", &format!("'{}' is not a valid number", s))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if thresholds.is_empty() {
        return Err(invalid("COUNTER_THRESHOLDS", "at least one threshold is required"));
    }
    Ok(thresholds)
}
