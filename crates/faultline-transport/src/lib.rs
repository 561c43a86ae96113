//! Delivery layer for faultline diagnostic reports
//!
//! The boundary core never talks to the network itself. It hands serialized
//! reports to a [`DiagnosticTransport`], and this crate provides the default
//! one: an HTTP client that POSTs JSON to a collector endpoint with a bounded
//! retry budget.
//!
//! # Architecture
//!
//! - **Transport trait**: [`DiagnosticTransport`], the seam the reporter calls
//! - **HTTP transport**: [`HttpTransport`], reqwest-backed, retries with backoff
//! - **Error handling**: [`TransportError`], classified for retry decisions

#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! # Usage
//!
//! ```ignore
//! use faultline_transport::{DiagnosticTransport, HttpRequest, HttpTransport};
//!
//! let transport = HttpTransport::new()?;
//! let request = HttpRequest::post("https://collector.example.com/v1/sdk_exception")
//!     .with_json_body(&serde_json::json!({ "tag": "initialize" }))?;
//! let response = transport.deliver(request).await?;
//! ```

pub mod error;
pub mod http;
pub mod traits;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use http::{HttpTransport, HttpTransportConfig, RetryPolicy};
pub use traits::{DiagnosticTransport, HttpRequest, HttpResponse};
