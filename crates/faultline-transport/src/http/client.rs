//! HTTP transport client implementation
//!
//! Implements [`DiagnosticTransport`] over reqwest with bounded retries.

use crate::error::{Result, TransportError};
use crate::traits::{DiagnosticTransport, HttpRequest, HttpResponse};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use super::retry::RetryPolicy;

/// HTTP transport implementation
///
/// Handles report delivery with:
/// - Automatic retries of transient failures with exponential backoff
/// - Connection pooling
/// - Per-request timeout
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    retry_policy: RetryPolicy,
}

impl HttpTransport {
    /// Create a new HTTP transport with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Create a new HTTP transport with custom configuration
    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;

        Ok(Self {
            client,
            retry_policy: config.retry_policy,
        })
    }

    /// Set the retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// The retry policy applied to every delivery
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    async fn try_send(&self, request: &HttpRequest, method: &reqwest::Method) -> Result<HttpResponse> {
        let mut req = self.client.request(method.clone(), &request.url);

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        let response = req.send().await?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(key, value)| Some((key.to_string(), value.to_str().ok()?.to_string())))
            .collect();
        let body = response.bytes().await?.to_vec();

        HttpResponse::new(status, headers, body).error_for_status()
    }
}

#[async_trait]
impl DiagnosticTransport for HttpTransport {
    async fn deliver(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| TransportError::Http(format!("Unsupported HTTP method: {}", request.method)))?;

        let started = Instant::now();
        let mut attempt = 0;

        loop {
            match self.try_send(&request, &method).await {
                Ok(response) => {
                    debug!(
                        url = %request.url,
                        status = response.status,
                        attempts = attempt + 1,
                        elapsed_ms = started.elapsed().as_millis(),
                        "Report delivered"
                    );
                    return Ok(response);
                }
                Err(err) if self.retry_policy.should_retry(&err, attempt) => {
                    let delay = self.retry_policy.delay_for(attempt);
                    debug!(
                        url = %request.url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "Report delivery failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// HTTP transport configuration
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Retry policy
    pub retry_policy: RetryPolicy,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            pool_max_idle_per_host: 2,
            retry_policy: RetryPolicy::default(),
        }
    }
}
