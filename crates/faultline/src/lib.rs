//! # faultline
//!
//! Fault-isolation boundary for client SDKs:
//! - Runs caller-supplied work and intercepts errors and panics raised inside it
//! - Optionally runs a fallback after a failure
//! - Deduplicates failures by call-site tag and failure kind
//! - Reports each distinct failure once, in the background, to a diagnostics collector
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use faultline::{DeviceEnvironment, ErrorBoundary};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("malformed flag payload")]
//! struct ParseError;
//!
//! let boundary = ErrorBoundary::create(
//!     "client-key-123",
//!     Some(DeviceEnvironment::new().with("sdk", "1.0")),
//! );
//!
//! // Never unwinds or returns the error to the host application
//! boundary.capture("initialize", || -> Result<(), ParseError> { Err(ParseError) });
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export commonly used types
pub use boundary::{DEFAULT_TAG, ErrorBoundary, ErrorBoundaryBuilder};
pub use cache::ReportCache;
pub use config::{BoundaryConfig, BoundaryConfigBuilder};
pub use environment::{DeviceEnvironment, Scalar};
pub use error::{Error, Result};
pub use failure::{CapturedFailure, TaskOutcome};
pub use observability::BoundaryStats;
pub use report::{ClientKey, DiagnosticReport};
pub use reporter::DiagnosticReporter;
pub use signature::FailureSignature;

// Module declarations
pub mod boundary;
pub mod cache;
pub mod config;
pub mod environment;
pub mod error;
pub mod failure;
pub mod observability;
pub mod report;
pub mod reporter;
pub mod signature;

// Re-export the delivery layer for custom transports
pub use async_trait::async_trait;
pub use faultline_transport as transport;
pub use faultline_transport::{DiagnosticTransport, HttpRequest, HttpResponse};

/// Prelude module for common imports
///
/// # Examples
///
/// ```rust
/// use faultline::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BoundaryConfig, CapturedFailure, DeviceEnvironment, ErrorBoundary, TaskOutcome,
    };
}

/// SDK version, automatically updated from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
