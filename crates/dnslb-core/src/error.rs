//! Error types for the DNSLB system
//!
//! This module defines all error types used throughout the crate.
//!
//! The reconciliation engine classifies failures into three kinds:
//! probe setup failures (degrade one address to unreachable), fetch failures
//! (skip the zone pass) and publish failures (discard the computed state).
//! None of them stop the scheduler.

use thiserror::Error;

/// Result type alias for DNSLB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DNSLB system
#[derive(Error, Debug)]
pub enum Error {
    /// Probe setup failed (socket creation, privilege, unparsable target)
    #[error("Probe error: {0}")]
    Probe(String),

    /// Zone pull failed or returned malformed data
    #[error("Failed to fetch zone {zone}: {message}")]
    Fetch {
        /// Zone name
        zone: String,
        /// Error message
        message: String,
    },

    /// Record set write was rejected or failed
    #[error("Failed to publish {record_set} in zone {zone}: {message}")]
    Publish {
        /// Zone name
        zone: String,
        /// Record set owner name
        record_set: String,
        /// Error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (from controller APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Zone or record set not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a probe setup error
    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe(msg.into())
    }

    /// Create a fetch failure for a zone
    pub fn fetch(zone: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            zone: zone.into(),
            message: message.into(),
        }
    }

    /// Create a publish failure for a record set
    pub fn publish(
        zone: impl Into<String>,
        record_set: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Publish {
            zone: zone.into(),
            record_set: record_set.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether the error is a probe setup failure
    pub fn is_probe_setup(&self) -> bool {
        matches!(self, Self::Probe(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
