//! Deduplication keys for captured failures

use crate::failure::CapturedFailure;
use std::fmt;

/// Stable identity of a recurring failure: the guarded call site's tag plus
/// the failure's type.
///
/// Identity uses the fully qualified type path, so two types that share a
/// short name (every crate's `Error`) never collide. Displays as `tag:kind`
/// with the short kind. Messages are deliberately left out. They routinely carry identifiers,
/// counts or paths that differ between occurrences of the same bug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FailureSignature {
    tag: String,
    kind: String,
    type_path: String,
}

impl FailureSignature {
    /// Derive the signature of `failure` raised under `tag`.
    pub fn of(tag: &str, failure: &CapturedFailure) -> Self {
        Self {
            tag: tag.to_string(),
            kind: failure.kind().to_string(),
            type_path: failure.type_path().to_string(),
        }
    }

    /// Tag of the guarded call site.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Failure kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Fully qualified failure type.
    pub fn type_path(&self) -> &str {
        &self.type_path
    }
}

impl fmt::Display for FailureSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag, self.kind)
    }
}
