//! Transport error types

use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while delivering a report
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request could not be built or sent
    #[error("HTTP error: {0}")]
    Http(String),

    /// Collector answered with a non-success status
    #[error("Collector returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timed out
    #[error("Timeout")]
    Timeout,

    /// Body could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether a fresh attempt could plausibly succeed.
    ///
    /// Timeouts, connection failures and 5xx/429 statuses are transient;
    /// everything else will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection(_) => true,
            Self::Status { status } => *status >= 500 || *status == 429,
            Self::Http(_) | Self::Serialization(_) | Self::Io(_) => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
