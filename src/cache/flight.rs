//! Per-process deduplication of in-flight lookups
//!
//! Maps opaque string keys to values computed at most once per process.
//! Concurrent callers with the same key block on the first computation and
//! observe its result; once stored, a value is immutable and is returned
//! for the lifetime of the process.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Single-flight memoization cache keyed by `"<operation>:<argument>"`
/// strings
///
/// The keyspace is deliberately flat across operations so that one
/// operation can seed results for another under a different key.
pub struct FlightCache<V> {
    slots: Mutex<HashMap<String, Arc<OnceCell<V>>>>,
}

impl<V> FlightCache<V> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> FlightCache<V> {
    /// Return the value for `key`, running `init` only if no caller has
    /// stored one yet
    ///
    /// If two producers race on one key, the first completion wins and the
    /// loser is discarded unrun. The winning producer's side effects are
    /// visible to every caller that observes its value.
    pub async fn do_once<F, Fut>(&self, key: &str, init: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let slot = {
            let mut slots = self.slots.lock().expect("flight cache lock poisoned");
            slots.entry(key.to_string()).or_default().clone()
        };
        slot.get_or_init(init).await.clone()
    }
}

impl<V> Default for FlightCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
