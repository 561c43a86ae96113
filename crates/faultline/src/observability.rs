//! Centralized observability for the boundary
//!
//! Every log line the boundary and reporter emit goes through this module, and
//! the counters behind [`BoundaryStats`] live here. Nothing is printed unless
//! the host installs a `tracing` subscriber.

use crate::failure::CapturedFailure;
use crate::signature::FailureSignature;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Snapshot of a boundary's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundaryStats {
    /// Guarded failures intercepted
    pub captured: u64,
    /// Reports handed to the reporter
    pub dispatched: u64,
    /// Failures not reported because their signature was already seen
    pub suppressed: u64,
    /// Reports the reporter refused (queue full, not running, disabled)
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    captured: AtomicU64,
    dispatched: AtomicU64,
    suppressed: AtomicU64,
    dropped: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_captured(&self) {
        self.captured.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BoundaryStats {
        BoundaryStats {
            captured: self.captured.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Log a failure intercepted from a guarded task
pub fn log_guarded_failure(tag: &str, failure: &CapturedFailure) {
    warn!(
        tag = %tag,
        kind = %failure.kind(),
        message = %failure.message(),
        "An unexpected failure occurred in a guarded task"
    );
}

/// Log a failure whose signature was already reported
pub fn log_duplicate_suppressed(signature: &FailureSignature) {
    debug!(signature = %signature, "Failure already reported, suppressing");
}

/// Log a report that never reached the reporter's queue
pub fn log_report_dropped(signature: &FailureSignature, reason: &dyn std::error::Error, enabled: bool) {
    if enabled {
        warn!(signature = %signature, reason = %reason, "Diagnostic report dropped");
    } else {
        debug!(signature = %signature, "Reporting disabled, report not sent");
    }
}

/// Log a panic raised while reporting a guarded failure
pub fn log_reporting_panicked(tag: &str, panic: &CapturedFailure) {
    warn!(
        tag = %tag,
        message = %panic.message(),
        "Reporting a guarded failure panicked; report abandoned"
    );
}

/// Log that reports cannot leave the process for this boundary
pub fn log_reporter_unavailable(reason: &str) {
    warn!(reason = %reason, "Diagnostic reporting unavailable");
}

/// Delivery metadata for structured logging
#[derive(Debug, Clone)]
pub struct DeliveryMetadata {
    /// Tag of the failing call site
    pub tag: String,
    /// Failure kind
    pub kind: String,
    /// Transport carrying the report
    pub transport: &'static str,
}

impl DeliveryMetadata {
    /// Create new delivery metadata
    pub fn new(tag: impl Into<String>, kind: impl Into<String>, transport: &'static str) -> Self {
        Self {
            tag: tag.into(),
            kind: kind.into(),
            transport,
        }
    }

    /// Log delivery starting
    pub fn log_started(&self) {
        debug!(
            tag = %self.tag,
            kind = %self.kind,
            transport = self.transport,
            "Sending diagnostic report"
        );
    }

    /// Log successful delivery
    pub fn log_success(&self, status: u16, elapsed: Duration) {
        info!(
            tag = %self.tag,
            kind = %self.kind,
            transport = self.transport,
            status,
            elapsed_ms = elapsed.as_millis(),
            "Diagnostic report delivered"
        );
    }

    /// Log failed delivery; the report is dropped afterwards
    pub fn log_failure(&self, error: &dyn std::error::Error, elapsed: Duration) {
        warn!(
            tag = %self.tag,
            kind = %self.kind,
            transport = self.transport,
            elapsed_ms = elapsed.as_millis(),
            error = %error,
            "Diagnostic report delivery failed"
        );
    }
}
