//! Outbound diagnostic payload

use crate::environment::DeviceEnvironment;
use crate::error::{Error, Result};
use crate::failure::CapturedFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque SDK tenant key, fixed for the lifetime of a boundary.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientKey(String);

impl ClientKey {
    /// Create a key, rejecting empty or whitespace-only input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyClientKey`] if `key` has no visible characters.
    pub fn new(key: impl AsRef<str>) -> Result<Self> {
        let key = key.as_ref();
        if key.trim().is_empty() {
            return Err(Error::EmptyClientKey);
        }
        Ok(Self(key.to_string()))
    }

    /// Create a key without validation.
    pub(crate) fn unchecked(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().to_string())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the key is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Client keys end up in logs; keep them out of `{:?}` output.
impl fmt::Debug for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.0.chars().take(7).collect();
        write!(f, "ClientKey({visible}…)")
    }
}

/// One newly seen failure, as sent to the collector.
///
/// Serialized as camelCase JSON. `stackTrace` and `deviceEnvironment` are
/// omitted when absent; `timestamp` is Unix epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    /// Tenant the failure belongs to
    pub client_key: ClientKey,

    /// Guarded call site
    pub tag: String,

    /// Failure type name or category
    pub failure_kind: String,

    /// Failure description
    pub failure_message: String,

    /// Stack trace, if one was captured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,

    /// Device snapshot taken when the boundary was built
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_environment: Option<DeviceEnvironment>,

    /// When the failure was intercepted
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl DiagnosticReport {
    /// Build a report for `failure` raised under `tag`, stamped now.
    pub fn new(
        client_key: ClientKey,
        device_environment: Option<DeviceEnvironment>,
        tag: &str,
        failure: &CapturedFailure,
    ) -> Self {
        Self {
            client_key,
            tag: tag.to_string(),
            failure_kind: failure.kind().to_string(),
            failure_message: failure.message().to_string(),
            stack_trace: failure.stack_trace().map(str::to_string),
            device_environment,
            timestamp: Utc::now(),
        }
    }

    /// Encode the report as a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
