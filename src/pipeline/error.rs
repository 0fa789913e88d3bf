//! Error types for the pipeline collaborators
//!
//! None of these are fatal to the process. Fetch and delivery errors are
//! absorbed by the component that owns the call; only `ConfigError` and
//! `RulesError` can stop the runtime, and only at startup.

/// Failure while fetching one page of server identifiers
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Upstream answered 429 Too Many Requests
    #[error("rate limited by upstream")]
    RateLimited,

    /// Connection, timeout, or non-success status
    #[error("transport error: {0}")]
    Transport(String),

    /// Body could not be decoded
    #[error("malformed response: {0}")]
    Format(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Format(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Failure while delivering a notification or status message
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("channel returned status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("delivery timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("malformed response: {0}")]
    Format(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DeliveryError::Format(err.to_string())
        } else {
            DeliveryError::Transport(err.to_string())
        }
    }
}

/// Invalid runtime configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {var}: {msg}")]
    InvalidValue { var: String, msg: String },

    #[error(transparent)]
    Rules(#[from] RulesError),
}

/// Rule table could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("failed to read rule file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse rule file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid rule table: {0}")]
    Invalid(String),
}
