//! The error boundary: run caller work, intercept its failures, report each
//! distinct failure once.

use crate::cache::ReportCache;
use crate::config::BoundaryConfig;
use crate::environment::DeviceEnvironment;
use crate::error::Error;
use crate::failure::{CapturedFailure, TaskOutcome, capture_backtrace};
use crate::observability::{self, BoundaryStats, StatsCounters};
use crate::report::{ClientKey, DiagnosticReport};
use crate::reporter::DiagnosticReporter;
use crate::signature::FailureSignature;
use faultline_transport::{DiagnosticTransport, HttpTransport, HttpTransportConfig, RetryPolicy};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Tag used by the untagged legacy entry points.
pub const DEFAULT_TAG: &str = "unknown";

/// Fault-isolation boundary for one client key.
///
/// `capture` runs a task synchronously on the calling thread. If the task
/// returns an error or panics, the failure is swallowed: it is logged,
/// deduplicated by [`FailureSignature`], and, the first time its signature is
/// seen, handed to a background reporter. The caller always gets control back
/// normally. Only a `recovery` closure, which runs outside the boundary, can
/// make a `capture` call unwind.
///
/// Cloning is cheap and clones share the same report cache and reporter.
///
/// When `RUST_BACKTRACE` or `RUST_LIB_BACKTRACE` enables backtraces, reports
/// without an explicit stack trace get one taken inside `capture`. It shows
/// the path into the guarded call, not the frame that failed.
///
/// Panics can only be intercepted when the binary unwinds on panic; under
/// `panic = "abort"` they terminate the process as usual. The default panic
/// hook still prints intercepted panics to stderr.
///
/// # Examples
///
/// ```rust,no_run
/// use faultline::{DeviceEnvironment, ErrorBoundary};
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("flag store unavailable")]
/// struct StoreError;
///
/// let boundary = ErrorBoundary::create("client-key", Some(DeviceEnvironment::detect()));
///
/// boundary.capture("checkGate", || -> Result<(), StoreError> { Err(StoreError) });
///
/// let mut enabled = true;
/// boundary.capture_with_recovery(
///     "checkGate",
///     || -> Result<(), StoreError> { Err(StoreError) },
///     || enabled = false,
/// );
/// assert!(!enabled);
/// ```
#[derive(Clone)]
pub struct ErrorBoundary {
    inner: Arc<Inner>,
}

struct Inner {
    client_key: ClientKey,
    device_environment: Option<DeviceEnvironment>,
    cache: ReportCache,
    reporter: DiagnosticReporter,
    stats: StatsCounters,
}

impl ErrorBoundary {
    /// Create a boundary reporting over HTTP with the default configuration.
    ///
    /// Never fails; see [`ErrorBoundaryBuilder::build`].
    pub fn create(client_key: impl AsRef<str>, device_environment: Option<DeviceEnvironment>) -> Self {
        Self::builder(client_key)
            .device_environment(device_environment)
            .build()
    }

    /// Start configuring a boundary.
    pub fn builder(client_key: impl AsRef<str>) -> ErrorBoundaryBuilder {
        ErrorBoundaryBuilder {
            client_key: ClientKey::unchecked(client_key),
            device_environment: None,
            config: BoundaryConfig::default(),
            transport: None,
        }
    }

    /// Run `task`, swallowing any failure it raises.
    pub fn capture<F, O>(&self, tag: &str, task: F)
    where
        F: FnOnce() -> O,
        O: TaskOutcome,
    {
        self.run_guarded(tag, task);
    }

    /// Run `task`; if it fails, swallow the failure and then run `recovery`.
    ///
    /// `recovery` is not guarded. A panic inside it propagates to the caller.
    pub fn capture_with_recovery<F, O, R>(&self, tag: &str, task: F, recovery: R)
    where
        F: FnOnce() -> O,
        O: TaskOutcome,
        R: FnOnce(),
    {
        if self.run_guarded(tag, task) {
            recovery();
        }
    }

    /// [`capture`](Self::capture) under [`DEFAULT_TAG`].
    #[deprecated(since = "0.1.0", note = "pass an explicit tag to `capture`")]
    pub fn capture_untagged<F, O>(&self, task: F)
    where
        F: FnOnce() -> O,
        O: TaskOutcome,
    {
        self.capture(DEFAULT_TAG, task);
    }

    /// [`capture_with_recovery`](Self::capture_with_recovery) under [`DEFAULT_TAG`].
    #[deprecated(since = "0.1.0", note = "pass an explicit tag to `capture_with_recovery`")]
    pub fn capture_untagged_with_recovery<F, O, R>(&self, task: F, recovery: R)
    where
        F: FnOnce() -> O,
        O: TaskOutcome,
        R: FnOnce(),
    {
        self.capture_with_recovery(DEFAULT_TAG, task, recovery);
    }

    /// The client key reports are filed under.
    pub fn client_key(&self) -> &ClientKey {
        &self.inner.client_key
    }

    /// The device snapshot attached to reports, if any.
    pub fn device_environment(&self) -> Option<&DeviceEnvironment> {
        self.inner.device_environment.as_ref()
    }

    /// Whether reports can leave the process.
    pub fn is_reporting(&self) -> bool {
        self.inner.reporter.is_enabled()
    }

    /// Counters since construction.
    pub fn stats(&self) -> BoundaryStats {
        self.inner.stats.snapshot()
    }

    /// Forget which signatures were reported, so each may be reported once more.
    pub fn reset_reported(&self) {
        self.inner.cache.clear();
    }

    /// Returns `true` if the task failed.
    fn run_guarded<F, O>(&self, tag: &str, task: F) -> bool
    where
        F: FnOnce() -> O,
        O: TaskOutcome,
    {
        let failure = match panic::catch_unwind(AssertUnwindSafe(|| task().into_failure())) {
            Ok(None) => return false,
            Ok(Some(failure)) => failure,
            Err(payload) => CapturedFailure::from_panic(payload.as_ref()),
        };

        // Reporting must not unwind into the caller either.
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.handle_failure(tag, &failure))) {
            observability::log_reporting_panicked(tag, &CapturedFailure::from_panic(payload.as_ref()));
        }
        true
    }

    fn handle_failure(&self, tag: &str, failure: &CapturedFailure) {
        let inner = &self.inner;
        inner.stats.record_captured();
        observability::log_guarded_failure(tag, failure);

        let signature = FailureSignature::of(tag, failure);
        if !inner.cache.should_report(&signature) {
            inner.stats.record_suppressed();
            observability::log_duplicate_suppressed(&signature);
            return;
        }

        let report = DiagnosticReport::new(
            inner.client_key.clone(),
            inner.device_environment.clone(),
            tag,
            failure,
        );

        let backtrace = match failure.stack_trace() {
            Some(_) => None,
            None => capture_backtrace(),
        };

        match inner.reporter.send_with_backtrace(report, backtrace) {
            Ok(()) => inner.stats.record_dispatched(),
            Err(e) => {
                inner.stats.record_dropped();
                // A full queue is transient; the next occurrence gets another chance.
                if matches!(e, Error::QueueFull) {
                    inner.cache.forget(&signature);
                }
                observability::log_report_dropped(&signature, &e, inner.reporter.is_enabled());
            }
        }
    }
}

impl fmt::Debug for ErrorBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorBoundary")
            .field("client_key", &self.inner.client_key)
            .field("reporting", &self.is_reporting())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Builder for [`ErrorBoundary`].
pub struct ErrorBoundaryBuilder {
    client_key: ClientKey,
    device_environment: Option<DeviceEnvironment>,
    config: BoundaryConfig,
    transport: Option<Arc<dyn DiagnosticTransport>>,
}

impl ErrorBoundaryBuilder {
    /// Attach a device snapshot to every report, or none.
    pub fn device_environment(mut self, device_environment: Option<DeviceEnvironment>) -> Self {
        self.device_environment = device_environment;
        self
    }

    /// Use `config` instead of the defaults.
    pub fn config(mut self, config: BoundaryConfig) -> Self {
        self.config = config;
        self
    }

    /// Deliver reports through `transport` instead of the built-in HTTP client.
    pub fn transport(mut self, transport: Arc<dyn DiagnosticTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the boundary.
    ///
    /// Never fails. An invalid configuration, a disabled configuration or an
    /// HTTP client that cannot be created all leave the boundary intercepting
    /// failures with reporting switched off; the first and last are logged.
    pub fn build(self) -> ErrorBoundary {
        if self.client_key.is_empty() {
            tracing::debug!("Error boundary created with an empty client key");
        }

        let reporter = self.start_reporter();

        ErrorBoundary {
            inner: Arc::new(Inner {
                client_key: self.client_key,
                device_environment: self.device_environment,
                cache: ReportCache::new(self.config.cache_capacity),
                reporter,
                stats: StatsCounters::default(),
            }),
        }
    }

    fn start_reporter(&self) -> DiagnosticReporter {
        if !self.config.enabled {
            return DiagnosticReporter::disabled();
        }

        if let Err(e) = self.config.validate() {
            observability::log_reporter_unavailable(&e.to_string());
            return DiagnosticReporter::disabled();
        }

        let transport = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => match http_transport(&self.config) {
                Ok(transport) => transport,
                Err(e) => {
                    observability::log_reporter_unavailable(&e.to_string());
                    return DiagnosticReporter::disabled();
                }
            },
        };

        DiagnosticReporter::start(transport, &self.config)
    }
}

fn http_transport(config: &BoundaryConfig) -> faultline_transport::Result<Arc<dyn DiagnosticTransport>> {
    let transport = HttpTransport::with_config(HttpTransportConfig {
        timeout: config.request_timeout,
        retry_policy: RetryPolicy::builder().max_retries(config.max_retries).build(),
        ..Default::default()
    })?;
    Ok(Arc::new(transport))
}
