//! Set of signatures already reported in this process
//!
//! Bounded to the `capacity` most recently seen distinct signatures. A
//! signature evicted by newer ones may be reported again if it recurs.

use crate::signature::FailureSignature;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Thread-safe, bounded record of reported failure signatures.
#[derive(Debug)]
pub struct ReportCache {
    seen: Mutex<LruCache<FailureSignature, ()>>,
}

impl ReportCache {
    /// Create a cache holding at most `capacity` signatures (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            seen: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Record `signature` and return `true` if it had not been seen.
    ///
    /// Check and insert happen under one lock, so when many threads race on
    /// the same new signature exactly one of them gets `true`. A repeat hit
    /// refreshes the signature's recency.
    pub fn should_report(&self, signature: &FailureSignature) -> bool {
        let mut seen = self.seen.lock();
        if seen.get(signature).is_some() {
            return false;
        }
        seen.put(signature.clone(), ());
        true
    }

    /// Forget `signature` so its next occurrence is reported.
    ///
    /// Returns `true` if it was remembered.
    pub fn forget(&self, signature: &FailureSignature) -> bool {
        self.seen.lock().pop(signature).is_some()
    }

    /// Whether `signature` is currently remembered, without touching recency.
    pub fn contains(&self, signature: &FailureSignature) -> bool {
        self.seen.lock().contains(signature)
    }

    /// Number of remembered signatures.
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    /// Whether nothing has been reported yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of remembered signatures.
    pub fn capacity(&self) -> usize {
        self.seen.lock().cap().get()
    }

    /// Forget every signature.
    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}
