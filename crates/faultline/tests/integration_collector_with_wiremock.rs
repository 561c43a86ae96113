//! End-to-end tests against a mock diagnostics collector
//!
//! Exercises the real HTTP transport: payload shape, auth header, and that
//! collector failures never reach the caller.

mod common;

use common::TypeError;
use faultline::{BoundaryConfig, DeviceEnvironment, ErrorBoundary};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> BoundaryConfig {
    BoundaryConfig::builder()
        .endpoint(format!("{}/v1/sdk_exception", server.uri()))
        .request_timeout(Duration::from_secs(2))
        .max_retries(0)
        .build()
        .expect("valid config")
}

async fn wait_for_requests(server: &MockServer, count: usize) -> Vec<wiremock::Request> {
    for _ in 0..200 {
        let received = server.received_requests().await.unwrap_or_default();
        if received.len() >= count {
            return received;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("collector did not receive {count} requests");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_report_reaches_collector() {
    common::init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/sdk_exception"))
        .and(header("STATSIG-API-KEY", "client-key"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&mock_server)
        .await;

    let boundary = ErrorBoundary::builder("client-key")
        .device_environment(Some(DeviceEnvironment::new().with("sdkType", "ios")))
        .config(config_for(&mock_server))
        .build();

    boundary.capture("initialize", || -> Result<(), TypeError> {
        Err(TypeError("ShouldCrash".into()))
    });

    let received = wait_for_requests(&mock_server, 1).await;
    let body: serde_json::Value = received[0].body_json().unwrap();

    assert_eq!(body["clientKey"], "client-key");
    assert_eq!(body["tag"], "initialize");
    assert_eq!(body["failureKind"], "TypeError");
    assert_eq!(body["failureMessage"], "ShouldCrash");
    assert_eq!(body["deviceEnvironment"]["sdkType"], "ios");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_recovers_and_reports() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&mock_server)
        .await;

    let boundary = ErrorBoundary::builder("client-key")
        .config(config_for(&mock_server))
        .build();

    let mut recovered = false;
    boundary.capture_with_recovery(
        "getConfig",
        || -> Result<(), TypeError> { Err(TypeError("ShouldCrash".into())) },
        || recovered = true,
    );

    assert!(recovered);
    wait_for_requests(&mock_server, 1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_collector_errors_are_invisible_to_caller() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let boundary = ErrorBoundary::builder("client-key")
        .config(config_for(&mock_server))
        .build();

    boundary.capture("init", || -> Result<(), TypeError> { Err(TypeError("a".into())) });
    boundary.capture("flush", || -> Result<(), TypeError> { Err(TypeError("b".into())) });

    wait_for_requests(&mock_server, 2).await;
    assert_eq!(boundary.stats().dispatched, 2);
    assert_eq!(boundary.stats().dropped, 0);
}

#[test]
fn test_unreachable_collector_never_blocks_capture() {
    // Nothing listens on port 9; delivery fails in the background
    let boundary = ErrorBoundary::builder("client-key")
        .config(
            BoundaryConfig::builder()
                .endpoint("http://127.0.0.1:9/v1/sdk_exception")
                .max_retries(0)
                .build()
                .unwrap(),
        )
        .build();

    let started = std::time::Instant::now();
    for i in 0..10 {
        boundary.capture(&format!("call-{i}"), || -> Result<(), TypeError> {
            Err(TypeError("offline".into()))
        });
    }

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(boundary.stats().captured, 10);
}
