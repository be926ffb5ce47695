//! Per-namespace sequence allocation.

use std::sync::Arc;

use keel_store::KvStore;
use tracing::debug;

use crate::error::{IdentError, Result};

/// Hash holding one counter per namespace (field = namespace).
pub const DEFAULT_COUNTERS_KEY: &str = "__keel_counters__";

/// Issues race-free, zero-based sequence numbers per namespace.
///
/// Each namespace has one persisted counter. [`allocate`](Self::allocate)
/// increments it with a single atomic store operation and returns the value
/// it had before the increment. Counters are never decremented or removed, so
/// a sequence is never handed out twice, even after the record that used it
/// has been deleted.
pub struct IdAllocator {
    store: Arc<dyn KvStore>,
    counters_key: String,
}

impl IdAllocator {
    /// Allocator using [`DEFAULT_COUNTERS_KEY`].
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_key(store, DEFAULT_COUNTERS_KEY)
    }

    /// Allocator keeping its counters in the hash `counters_key`.
    pub fn with_key(store: Arc<dyn KvStore>, counters_key: impl Into<String>) -> Self {
        Self {
            store,
            counters_key: counters_key.into(),
        }
    }

    /// The hash holding the counters.
    pub fn counters_key(&self) -> &str {
        &self.counters_key
    }

    /// Reserve the next sequence number of `namespace`.
    pub fn allocate(&self, namespace: &str) -> Result<u64> {
        check_namespace(namespace)?;
        let next = self.store.hincrby(&self.counters_key, namespace, 1)?;
        // A counter only ever moves up from zero, so after one increment it
        // must be at least one.
        let sequence = u64::try_from(next - 1).map_err(|_| {
            IdentError::MalformedPayload(format!("counter for {namespace} is {next}"))
        })?;
        debug!(namespace, sequence, "sequence allocated");
        Ok(sequence)
    }

    /// Current counter value of `namespace`: the number of sequences ever
    /// allocated, or `0` if the namespace has never been used. Does not
    /// mutate the counter.
    pub fn peek(&self, namespace: &str) -> Result<u64> {
        check_namespace(namespace)?;
        match self.store.hget(&self.counters_key, namespace)? {
            None => Ok(0),
            Some(text) => text.parse().map_err(|_| {
                IdentError::MalformedPayload(format!(
                    "counter for {namespace} is not a count: {text:?}"
                ))
            }),
        }
    }
}

impl std::fmt::Debug for IdAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdAllocator")
            .field("counters_key", &self.counters_key)
            .finish_non_exhaustive()
    }
}

fn check_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() {
        return Err(IdentError::InvalidArgument("empty namespace".into()));
    }
    Ok(())
}
