//! Keyed async mutexes for per-session and per-relationship exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A registry of lazily-allocated async mutexes, one per key.
///
/// Sessions are independently lockable units: holding the mutex for one
/// key serializes work on that key while leaving every other key free.
/// Locks are process-local; cross-process writers are kept correct by
/// the repository's compare-and-set.
#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex for `key`, allocating it on first use.
    ///
    /// Entries are never removed: the set of keys is bounded by the
    /// number of sessions and relationships this process touches.
    pub fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock poisoned");
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
