//! Error types for the boundary
//!
//! None of these ever reach a `capture` caller. They describe configuration
//! mistakes, which surface from the builders, and reporting failures, which
//! are logged and dropped inside the reporter.

use faultline_transport::TransportError;
use thiserror::Error;

/// Result type alias for fallible boundary operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// Delivering a report to the collector failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A report could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The collector endpoint is not a valid absolute URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A configuration value could not be parsed or is out of range.
    #[error("Invalid configuration for {key}: {reason}")]
    InvalidConfig {
        /// Setting name
        key: String,
        /// What was wrong with it
        reason: String,
    },

    /// A client key must contain at least one non-whitespace character.
    #[error("Client key must not be empty")]
    EmptyClientKey,

    /// The reporter's queue was full and the report was dropped.
    #[error("Report queue is full")]
    QueueFull,

    /// The reporter is not running, so the report was dropped.
    #[error("Reporter is not running")]
    ReporterClosed,
}

impl Error {
    pub(crate) fn invalid_config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
