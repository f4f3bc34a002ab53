//! Common error types for the gateway

use std::time::Duration;

use thiserror::Error;

/// Result type for upstream operations
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Errors that can occur while talking to the backend.
///
/// The messages carry internal detail (target URL, transport error) and are
/// meant for logs only. The HTTP layer translates every variant into a
/// generic client-facing body.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection refused, reset, or DNS failure
    #[error("Backend connection failed: {0}")]
    Connect(String),

    /// No complete response within the configured bound
    #[error("Backend did not respond within {0:?}")]
    Timeout(Duration),

    /// Response started but the body could not be read to the end
    #[error("Backend response truncated: {0}")]
    Truncated(String),

    /// Backend answered, but not with a success status (health probe only)
    #[error("Backend returned HTTP {0}")]
    Status(u16),

    /// The outbound request could not be built
    #[error("Invalid upstream request: {0}")]
    InvalidRequest(String),
}

/// Errors raised while assembling the gateway configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting has no value from any source
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A setting has a value that cannot be used
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// The config file could not be read
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
