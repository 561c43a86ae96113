//! HTTP transport implementation
//!
//! Provides a reqwest client that implements [`DiagnosticTransport`](crate::DiagnosticTransport),
//! retrying transient failures a bounded number of times before giving up.

pub mod client;
pub mod retry;

pub use client::{HttpTransport, HttpTransportConfig};
pub use retry::RetryPolicy;
