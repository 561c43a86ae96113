//! Shared helpers for integration tests

#![allow(dead_code)]

use faultline::{DiagnosticTransport, HttpRequest, HttpResponse, async_trait};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Collector stand-in that records every request it receives
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Decoded JSON bodies, in arrival order
    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.requests
            .lock()
            .iter()
            .map(|r| serde_json::from_slice(r.body.as_deref().unwrap_or(b"null")).unwrap())
            .collect()
    }

    /// Block the current thread until `count` requests arrived, or panic
    pub fn wait_for(&self, count: usize) {
        for _ in 0..400 {
            if self.count() >= count {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("expected {count} reports, got {}", self.count());
    }

    /// Give the reporter time to deliver anything still queued
    pub fn settle(&self) {
        std::thread::sleep(Duration::from_millis(100));
    }
}

#[async_trait]
impl DiagnosticTransport for RecordingTransport {
    async fn deliver(&self, request: HttpRequest) -> faultline::transport::Result<HttpResponse> {
        self.requests.lock().push(request);
        Ok(HttpResponse::new(202, HashMap::new(), Vec::new()))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Collector stand-in that parks the reporter's worker inside `deliver`
/// until [`open`](Self::open) is called
#[derive(Default)]
pub struct GatedTransport {
    requests: Mutex<Vec<HttpRequest>>,
    open: Mutex<bool>,
    opened: Condvar,
}

impl GatedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Block until `count` deliveries have started, or panic
    pub fn wait_for(&self, count: usize) {
        for _ in 0..400 {
            if self.count() >= count {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("expected {count} deliveries, got {}", self.count());
    }

    /// Let every parked and future delivery through
    pub fn open(&self) {
        *self.open.lock() = true;
        self.opened.notify_all();
    }
}

#[async_trait]
impl DiagnosticTransport for GatedTransport {
    async fn deliver(&self, request: HttpRequest) -> faultline::transport::Result<HttpResponse> {
        self.requests.lock().push(request);
        let mut open = self.open.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
        Ok(HttpResponse::new(202, HashMap::new(), Vec::new()))
    }
}

/// Error whose type name is `TypeError`
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TypeError(pub String);

/// Error whose type name is `RangeError`
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct RangeError(pub String);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
