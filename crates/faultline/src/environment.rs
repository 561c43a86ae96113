//! Device environment snapshot attached to every report

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

/// SDK type reported by [`DeviceEnvironment::detect`].
pub const SDK_TYPE: &str = "rust-client";

/// A scalar environment value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Free-form text
    String(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Immutable key/value description of the host device and SDK.
///
/// Captured once when the boundary is built and copied verbatim into every
/// report. Keys are kept sorted so payloads are stable.
///
/// ```rust
/// use faultline::DeviceEnvironment;
///
/// let env = DeviceEnvironment::new()
///     .with("os", "iOS")
///     .with("version", "17.0");
/// assert_eq!(env.get("os").map(|v| v.to_string()), Some("iOS".to_string()));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceEnvironment {
    values: BTreeMap<String, Scalar>,
}

impl DeviceEnvironment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot what the process can portably learn about itself.
    ///
    /// Populates `sdkType`, `sdkVersion`, `deviceOS`, `systemName`, `arch`
    /// and a `sessionID` that stays the same for the life of the process.
    pub fn detect() -> Self {
        Self::new()
            .with("sdkType", SDK_TYPE)
            .with("sdkVersion", crate::VERSION)
            .with("deviceOS", std::env::consts::OS)
            .with("systemName", std::env::consts::FAMILY)
            .with("arch", std::env::consts::ARCH)
            .with("sessionID", session_id())
    }

    /// Add or replace a value, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Option<Scalar> {
        self.values.insert(key.into(), value.into())
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.values.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for DeviceEnvironment
where
    K: Into<String>,
    V: Into<Scalar>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn session_id() -> String {
    static SESSION_ID: OnceLock<String> = OnceLock::new();
    SESSION_ID
        .get_or_init(|| Uuid::new_v4().to_string())
        .clone()
}
