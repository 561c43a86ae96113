//! Failures intercepted from guarded tasks
//!
//! Guarded work signals failure through one channel: it returns a
//! [`TaskOutcome`]. `()` means the task cannot fail except by panicking;
//! `Result<(), E>` lets it hand back any error that converts into a
//! [`CapturedFailure`]. Panics are intercepted separately by the boundary and
//! converted with [`CapturedFailure::from_panic`].
//!
//! Failures built here carry no stack trace of their own. The boundary takes
//! one at the `capture` call site, and only for failures it is about to
//! report.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;

/// Failure kind recorded for intercepted panics.
pub const PANIC_KIND: &str = "panic";

/// A failure intercepted from a guarded task.
///
/// Only lives for the duration of one `capture` call; the report built from
/// it is what outlives the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFailure {
    kind: String,
    type_path: String,
    message: String,
    stack_trace: Option<String>,
}

impl CapturedFailure {
    /// Create a failure with an explicit kind and message.
    ///
    /// The kind doubles as the failure's type identity.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        let kind = kind.into();
        Self {
            type_path: kind.clone(),
            kind,
            message: message.into(),
            stack_trace: None,
        }
    }

    /// Attach a stack trace.
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    /// Build a failure from a typed error.
    ///
    /// The kind is the error's type name without module path or generic
    /// arguments; the full path is kept as [`type_path`](Self::type_path) so
    /// that `std::io::Error` and `serde_json::Error` stay apart. The message is its `Display` output followed by its
    /// `source()` chain.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: StdError + 'static,
    {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        let type_path = std::any::type_name::<E>();
        Self {
            kind: short_type_name(type_path).to_string(),
            type_path: type_path.to_string(),
            message,
            stack_trace: None,
        }
    }

    /// Build a failure from a panic payload returned by `catch_unwind`.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };

        Self {
            kind: PANIC_KIND.to_string(),
            type_path: PANIC_KIND.to_string(),
            message,
            stack_trace: None,
        }
    }

    /// Type name or category of the failure.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Fully qualified type of the failure, including generic arguments.
    pub fn type_path(&self) -> &str {
        &self.type_path
    }

    /// Human-readable description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Stack trace attached with [`with_stack_trace`](Self::with_stack_trace).
    pub fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }
}

impl fmt::Display for CapturedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl<E> From<E> for CapturedFailure
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::from_error(&error)
    }
}

/// What a guarded task hands back to the boundary.
pub trait TaskOutcome {
    /// `Some` when the task failed.
    fn into_failure(self) -> Option<CapturedFailure>;
}

impl TaskOutcome for () {
    fn into_failure(self) -> Option<CapturedFailure> {
        None
    }
}

impl<E> TaskOutcome for Result<(), E>
where
    E: Into<CapturedFailure>,
{
    fn into_failure(self) -> Option<CapturedFailure> {
        self.err().map(Into::into)
    }
}

/// Walk the current stack without resolving symbols.
///
/// `None` unless `RUST_BACKTRACE` or `RUST_LIB_BACKTRACE` enables capture.
pub(crate) fn capture_backtrace() -> Option<Backtrace> {
    let backtrace = Backtrace::capture();
    (backtrace.status() == BacktraceStatus::Captured).then_some(backtrace)
}

/// `std::io::error::Error` -> `Error`, `my::Wrapper<my::Inner>` -> `Wrapper`.
fn short_type_name(full: &str) -> &str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}
