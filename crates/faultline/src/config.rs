//! Configuration for the error boundary

use crate::error::{Error, Result};
use std::time::Duration;
use url::Url;

/// Default collector endpoint for diagnostic reports.
pub const DEFAULT_ENDPOINT: &str = "https://statsigapi.net/v1/sdk_exception";

/// Default header carrying the client key.
pub const DEFAULT_API_KEY_HEADER: &str = "STATSIG-API-KEY";

const DEFAULT_CACHE_CAPACITY: usize = 512;
const DEFAULT_QUEUE_CAPACITY: usize = 64;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Configuration for an [`ErrorBoundary`](crate::ErrorBoundary).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryConfig {
    /// Collector URL that receives diagnostic reports
    pub endpoint: String,

    /// Header name used to send the client key
    pub api_key_header: String,

    /// Distinct signatures remembered before the least recently seen is evicted
    pub cache_capacity: usize,

    /// Reports that may wait for delivery before new ones are dropped
    pub queue_capacity: usize,

    /// Timeout for a single delivery attempt
    pub request_timeout: Duration,

    /// Retries after the first failed delivery attempt
    pub max_retries: u32,

    /// Whether reports leave the process at all
    pub enabled: bool,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            enabled: true,
        }
    }
}

impl BoundaryConfig {
    /// Create a builder starting from the defaults.
    pub fn builder() -> BoundaryConfigBuilder {
        BoundaryConfigBuilder::default()
    }

    /// Load configuration from environment variables.
    ///
    /// This will look for:
    /// - `FAULTLINE_ENDPOINT` for the collector URL
    /// - `FAULTLINE_CACHE_CAPACITY` for the number of remembered signatures
    /// - `FAULTLINE_QUEUE_CAPACITY` for the pending report limit
    /// - `FAULTLINE_TIMEOUT_SECS` for the per-attempt delivery timeout
    /// - `FAULTLINE_MAX_RETRIES` for delivery retries
    /// - `FAULTLINE_DISABLED` (`1`/`true`) to stop reports leaving the process
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for values that do not parse and
    /// [`Error::InvalidUrl`] for a malformed endpoint.
    pub fn from_env() -> Result<Self> {
        use std::env;

        let mut config = Self::default();

        if let Ok(endpoint) = env::var("FAULTLINE_ENDPOINT") {
            config.endpoint = endpoint;
        }

        if let Ok(raw) = env::var("FAULTLINE_CACHE_CAPACITY") {
            config.cache_capacity = parse_env("FAULTLINE_CACHE_CAPACITY", &raw)?;
        }

        if let Ok(raw) = env::var("FAULTLINE_QUEUE_CAPACITY") {
            config.queue_capacity = parse_env("FAULTLINE_QUEUE_CAPACITY", &raw)?;
        }

        if let Ok(raw) = env::var("FAULTLINE_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_env("FAULTLINE_TIMEOUT_SECS", &raw)?);
        }

        if let Ok(raw) = env::var("FAULTLINE_MAX_RETRIES") {
            config.max_retries = parse_env("FAULTLINE_MAX_RETRIES", &raw)?;
        }

        if let Ok(raw) = env::var("FAULTLINE_DISABLED") {
            config.enabled = !parse_flag("FAULTLINE_DISABLED", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the endpoint is not an absolute
    /// http(s) URL, and [`Error::InvalidConfig`] for zero capacities, a zero
    /// timeout or an empty header name.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.endpoint)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "{}: scheme must be http or https",
                self.endpoint
            )));
        }

        if self.api_key_header.trim().is_empty() {
            return Err(Error::invalid_config("api_key_header", "must not be empty"));
        }
        if self.cache_capacity == 0 {
            return Err(Error::invalid_config("cache_capacity", "must be greater than zero"));
        }
        if self.queue_capacity == 0 {
            return Err(Error::invalid_config("queue_capacity", "must be greater than zero"));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::invalid_config("request_timeout", "must be greater than zero"));
        }

        Ok(())
    }

    /// Merge this configuration with another, with non-default values of the other taking precedence.
    pub fn merge(mut self, other: BoundaryConfig) -> Self {
        let defaults = BoundaryConfig::default();

        if other.endpoint != defaults.endpoint {
            self.endpoint = other.endpoint;
        }
        if other.api_key_header != defaults.api_key_header {
            self.api_key_header = other.api_key_header;
        }
        if other.cache_capacity != defaults.cache_capacity {
            self.cache_capacity = other.cache_capacity;
        }
        if other.queue_capacity != defaults.queue_capacity {
            self.queue_capacity = other.queue_capacity;
        }
        if other.request_timeout != defaults.request_timeout {
            self.request_timeout = other.request_timeout;
        }
        if other.max_retries != defaults.max_retries {
            self.max_retries = other.max_retries;
        }
        if !other.enabled {
            self.enabled = false;
        }

        self
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| Error::invalid_config(key, format!("{raw:?}: {e}")))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::invalid_config(key, format!("{raw:?} is not a boolean"))),
    }
}

/// Builder for creating [`BoundaryConfig`] with a fluent API.
#[derive(Debug, Default)]
pub struct BoundaryConfigBuilder {
    config: BoundaryConfig,
}

impl BoundaryConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collector endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the header that carries the client key.
    pub fn api_key_header(mut self, header: impl Into<String>) -> Self {
        self.config.api_key_header = header.into();
        self
    }

    /// Set the number of distinct signatures remembered.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    /// Set the pending report limit.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Set the per-attempt delivery timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the number of delivery retries.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Enable or disable outbound reporting.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// See [`BoundaryConfig::validate`].
    pub fn build(self) -> Result<BoundaryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BoundaryConfig::default();
        assert_eq!(config.endpoint, "https://statsigapi.net/v1/sdk_exception");
        assert_eq!(config.api_key_header, "STATSIG-API-KEY");
        assert_eq!(config.cache_capacity, 512);
        assert_eq!(config.max_retries, 2);
        assert!(config.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = BoundaryConfig::builder()
            .endpoint("http://localhost:8080/v1/sdk_exception")
            .cache_capacity(8)
            .queue_capacity(4)
            .request_timeout(Duration::from_secs(2))
            .max_retries(0)
            .build()
            .unwrap();

        assert_eq!(config.endpoint, "http://localhost:8080/v1/sdk_exception");
        assert_eq!(config.cache_capacity, 8);
        assert_eq!(config.queue_capacity, 4);
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_builder_rejects_bad_values() {
        assert!(matches!(
            BoundaryConfig::builder().endpoint("not a url").build(),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            BoundaryConfig::builder().endpoint("ftp://example.com").build(),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            BoundaryConfig::builder().cache_capacity(0).build(),
            Err(Error::InvalidConfig { .. })
        ));
        assert!(matches!(
            BoundaryConfig::builder().api_key_header(" ").build(),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_config_merge() {
        let base = BoundaryConfig::builder().cache_capacity(16).build().unwrap();
        let overrides = BoundaryConfig::builder()
            .endpoint("https://collector.example.com/ingest")
            .enabled(false)
            .build()
            .unwrap();

        let merged = base.merge(overrides);
        assert_eq!(merged.cache_capacity, 16);
        assert_eq!(merged.endpoint, "https://collector.example.com/ingest");
        assert!(!merged.enabled);
    }

    #[test]
    fn test_from_env() {
        temp_env::with_vars(
            [
                ("FAULTLINE_ENDPOINT", Some("http://127.0.0.1:9000/report")),
                ("FAULTLINE_CACHE_CAPACITY", Some("32")),
                ("FAULTLINE_TIMEOUT_SECS", Some("3")),
                ("FAULTLINE_DISABLED", Some("true")),
                ("FAULTLINE_QUEUE_CAPACITY", None),
                ("FAULTLINE_MAX_RETRIES", None),
            ],
            || {
                let config = BoundaryConfig::from_env().unwrap();
                assert_eq!(config.endpoint, "http://127.0.0.1:9000/report");
                assert_eq!(config.cache_capacity, 32);
                assert_eq!(config.queue_capacity, 64);
                assert_eq!(config.request_timeout, Duration::from_secs(3));
                assert!(!config.enabled);
            },
        );
    }

    #[test]
    fn test_from_env_rejects_garbage() {
        temp_env::with_var("FAULTLINE_MAX_RETRIES", Some("many"), || {
            let err = BoundaryConfig::from_env().unwrap_err();
            assert!(matches!(err, Error::InvalidConfig { ref key, .. } if key == "FAULTLINE_MAX_RETRIES"));
        });
    }
}
