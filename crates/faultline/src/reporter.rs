//! Fire-and-forget delivery of diagnostic reports
//!
//! [`DiagnosticReporter::send`] only ever enqueues. A background worker owns
//! the queue and delivers each report in its own task, so reports reach the
//! collector in no particular order and a slow delivery never holds up the
//! next one. Delivery failures are logged and the report is dropped.
//!
//! The worker always runs on a dedicated `faultline-reporter` thread with its
//! own single-threaded runtime, so it outlives whatever runtime the boundary
//! happened to be built in. It exits once every handle to the reporter is
//! dropped and in-flight deliveries finish.
//!
//! Stack traces travel unresolved. Symbols are resolved on the worker when
//! the report is encoded, never on the thread that called `capture`.

use crate::config::BoundaryConfig;
use crate::error::{Error, Result};
use crate::observability::{self, DeliveryMetadata};
use crate::report::DiagnosticReport;
use faultline_transport::{DiagnosticTransport, HttpRequest};
use std::backtrace::Backtrace;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinSet;
use tracing::warn;

/// Name of the thread the delivery worker runs on.
pub const REPORTER_THREAD_NAME: &str = "faultline-reporter";

/// Queue-fronted handle to the background delivery worker.
#[derive(Debug)]
pub struct DiagnosticReporter {
    sender: Option<mpsc::Sender<Outgoing>>,
}

/// A queued report plus the stack trace still to be rendered into it.
#[derive(Debug)]
struct Outgoing {
    report: DiagnosticReport,
    backtrace: Option<Backtrace>,
}

impl Outgoing {
    fn into_report(self) -> DiagnosticReport {
        let Self { mut report, backtrace } = self;
        if let Some(backtrace) = backtrace {
            report.stack_trace.get_or_insert_with(|| backtrace.to_string());
        }
        report
    }
}

impl DiagnosticReporter {
    /// Start a worker delivering through `transport` to `config.endpoint`.
    ///
    /// Never fails. If no worker can be started the reporter comes back
    /// disabled and the reason is logged.
    pub fn start(transport: Arc<dyn DiagnosticTransport>, config: &BoundaryConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let delivery = Arc::new(Delivery {
            transport,
            endpoint: config.endpoint.clone(),
            api_key_header: config.api_key_header.clone(),
        });

        let spawned = std::thread::Builder::new()
            .name(REPORTER_THREAD_NAME.to_string())
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(run_worker(receiver, delivery)),
                    Err(e) => observability::log_reporter_unavailable(&e.to_string()),
                }
            });

        match spawned {
            Ok(_) => Self {
                sender: Some(sender),
            },
            Err(e) => {
                observability::log_reporter_unavailable(&e.to_string());
                Self::disabled()
            }
        }
    }

    /// A reporter that drops everything it is given.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Whether reports can leave the process.
    ///
    /// Turns `false` for good if the worker stops.
    pub fn is_enabled(&self) -> bool {
        self.sender.as_ref().is_some_and(|sender| !sender.is_closed())
    }

    /// Enqueue `report` for delivery without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] when too many reports are pending and
    /// [`Error::ReporterClosed`] when the reporter is disabled or its worker
    /// has stopped. The report is dropped in both cases.
    pub fn send(&self, report: DiagnosticReport) -> Result<()> {
        self.send_with_backtrace(report, None)
    }

    /// Like [`send`](Self::send), rendering `backtrace` into the report's
    /// `stack_trace` on the worker unless the report already has one.
    pub(crate) fn send_with_backtrace(
        &self,
        report: DiagnosticReport,
        backtrace: Option<Backtrace>,
    ) -> Result<()> {
        let Some(sender) = &self.sender else {
            return Err(Error::ReporterClosed);
        };

        sender.try_send(Outgoing { report, backtrace }).map_err(|e| match e {
            TrySendError::Full(_) => Error::QueueFull,
            TrySendError::Closed(_) => Error::ReporterClosed,
        })
    }
}

struct Delivery {
    transport: Arc<dyn DiagnosticTransport>,
    endpoint: String,
    api_key_header: String,
}

impl Delivery {
    async fn deliver(&self, report: DiagnosticReport) {
        let metadata = DeliveryMetadata::new(
            report.tag.as_str(),
            report.failure_kind.as_str(),
            self.transport.name(),
        );
        let started = Instant::now();
        metadata.log_started();

        match self.try_deliver(&report).await {
            Ok(status) => metadata.log_success(status, started.elapsed()),
            Err(e) => metadata.log_failure(&e, started.elapsed()),
        }
    }

    async fn try_deliver(&self, report: &DiagnosticReport) -> Result<u16> {
        let mut request = HttpRequest::post(self.endpoint.as_str())
            .with_header("Content-Type", "application/json")
            .with_body(report.to_json()?);

        if !report.client_key.is_empty() {
            request = request.with_header(self.api_key_header.as_str(), report.client_key.as_str());
        }

        let response = self.transport.deliver(request).await?;
        Ok(response.status)
    }
}

async fn run_worker(mut receiver: mpsc::Receiver<Outgoing>, delivery: Arc<Delivery>) {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            next = receiver.recv() => match next {
                Some(outgoing) => {
                    let delivery = Arc::clone(&delivery);
                    in_flight.spawn(async move { delivery.deliver(outgoing.into_report()).await });
                }
                None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "Diagnostic report task aborted");
                }
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Diagnostic report task aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::CapturedFailure;
    use crate::report::ClientKey;
    use async_trait::async_trait;
    use faultline_transport::{HttpResponse, TransportError};
    use parking_lot::{Condvar, Mutex};
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<HttpRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl DiagnosticTransport for Recorder {
        async fn deliver(&self, request: HttpRequest) -> faultline_transport::Result<HttpResponse> {
            self.requests.lock().push(request);
            if self.fail {
                Err(TransportError::Status { status: 500 })
            } else {
                Ok(HttpResponse::new(202, HashMap::new(), Vec::new()))
            }
        }
    }

    /// Holds the worker thread inside `deliver` until opened
    #[derive(Default)]
    struct Gate {
        entered: Mutex<usize>,
        open: Mutex<bool>,
        opened: Condvar,
    }

    impl Gate {
        fn wait_entered(&self) {
            for _ in 0..400 {
                if *self.entered.lock() > 0 {
                    return;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            panic!("worker never reached the transport");
        }

        fn release(&self) {
            *self.open.lock() = true;
            self.opened.notify_all();
        }
    }

    #[async_trait]
    impl DiagnosticTransport for Gate {
        async fn deliver(&self, _request: HttpRequest) -> faultline_transport::Result<HttpResponse> {
            *self.entered.lock() += 1;
            let mut open = self.open.lock();
            while !*open {
                self.opened.wait(&mut open);
            }
            Ok(HttpResponse::new(202, HashMap::new(), Vec::new()))
        }
    }

    fn report(key: &str) -> DiagnosticReport {
        DiagnosticReport::new(
            ClientKey::unchecked(key),
            None,
            "init",
            &CapturedFailure::new("TypeError", "bad"),
        )
    }

    fn wait_for_requests(recorder: &Recorder, count: usize) {
        for _ in 0..400 {
            if recorder.requests.lock().len() >= count {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("expected {count} delivered requests");
    }

    fn body(recorder: &Recorder, index: usize) -> serde_json::Value {
        let requests = recorder.requests.lock();
        serde_json::from_slice(requests[index].body.as_ref().unwrap()).unwrap()
    }

    #[test]
    fn test_delivers_with_key_header() {
        let recorder = Arc::new(Recorder::default());
        let reporter = DiagnosticReporter::start(recorder.clone(), &BoundaryConfig::default());

        reporter.send(report("client-key")).unwrap();
        wait_for_requests(&recorder, 1);

        {
            let requests = recorder.requests.lock();
            let request = &requests[0];
            assert_eq!(request.url, "https://statsigapi.net/v1/sdk_exception");
            assert_eq!(request.get_header("STATSIG-API-KEY"), Some("client-key"));
            assert_eq!(request.get_header("content-type"), Some("application/json"));
        }
        assert_eq!(body(&recorder, 0)["failureKind"], "TypeError");
    }

    #[test]
    fn test_empty_key_omits_header() {
        let recorder = Arc::new(Recorder::default());
        let reporter = DiagnosticReporter::start(recorder.clone(), &BoundaryConfig::default());

        reporter.send(report("")).unwrap();
        wait_for_requests(&recorder, 1);

        assert!(recorder.requests.lock()[0].get_header("STATSIG-API-KEY").is_none());
    }

    #[test]
    fn test_delivery_failure_is_swallowed() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let reporter = DiagnosticReporter::start(recorder.clone(), &BoundaryConfig::default());

        assert!(reporter.send(report("k")).is_ok());
        assert!(reporter.send(report("k")).is_ok());
        wait_for_requests(&recorder, 2);
    }

    #[test]
    fn test_existing_stack_trace_wins_over_backtrace() {
        let recorder = Arc::new(Recorder::default());
        let reporter = DiagnosticReporter::start(recorder.clone(), &BoundaryConfig::default());

        let mut explicit = report("k");
        explicit.stack_trace = Some("0: main".to_string());
        reporter
            .send_with_backtrace(explicit, Some(Backtrace::force_capture()))
            .unwrap();
        wait_for_requests(&recorder, 1);

        assert_eq!(body(&recorder, 0)["stackTrace"], "0: main");
    }

    #[test]
    fn test_backtrace_is_rendered_by_the_worker() {
        let recorder = Arc::new(Recorder::default());
        let reporter = DiagnosticReporter::start(recorder.clone(), &BoundaryConfig::default());

        reporter
            .send_with_backtrace(report("k"), Some(Backtrace::force_capture()))
            .unwrap();
        wait_for_requests(&recorder, 1);

        let trace = body(&recorder, 0)["stackTrace"].as_str().unwrap().to_string();
        assert!(!trace.is_empty());
    }

    #[tokio::test]
    async fn test_sends_from_inside_a_runtime() {
        let recorder = Arc::new(Recorder::default());
        let reporter = DiagnosticReporter::start(recorder.clone(), &BoundaryConfig::default());

        reporter.send(report("k")).unwrap();

        for _ in 0..400 {
            if !recorder.requests.lock().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("report was not delivered");
    }

    #[test]
    fn test_worker_outlives_the_starting_runtime() {
        let recorder = Arc::new(Recorder::default());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let reporter =
            runtime.block_on(async { DiagnosticReporter::start(recorder.clone(), &BoundaryConfig::default()) });
        drop(runtime);

        assert!(reporter.is_enabled());
        reporter.send(report("k")).unwrap();
        wait_for_requests(&recorder, 1);
    }

    #[test]
    fn test_stopped_worker_disables_reporter() {
        let (sender, receiver) = mpsc::channel(1);
        let reporter = DiagnosticReporter {
            sender: Some(sender),
        };
        assert!(reporter.is_enabled());

        drop(receiver);
        assert!(!reporter.is_enabled());
        assert!(matches!(reporter.send(report("k")), Err(Error::ReporterClosed)));
    }

    #[test]
    fn test_disabled_reporter_refuses() {
        let reporter = DiagnosticReporter::disabled();
        assert!(!reporter.is_enabled());
        assert!(matches!(reporter.send(report("k")), Err(Error::ReporterClosed)));
    }

    #[test]
    fn test_full_queue_drops_instead_of_blocking() {
        let gate = Arc::new(Gate::default());
        let config = BoundaryConfig {
            queue_capacity: 1,
            ..Default::default()
        };
        let reporter = DiagnosticReporter::start(gate.clone(), &config);

        reporter.send(report("k")).unwrap();
        // The worker's only thread is now parked inside the first delivery
        gate.wait_entered();
        reporter.send(report("k")).unwrap();
        assert!(matches!(reporter.send(report("k")), Err(Error::QueueFull)));

        gate.release();
    }
}
