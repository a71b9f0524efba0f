use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;

/// Registry of in-progress computations keyed by cache key.
///
/// Callers for the same key share one `OnceCell`; only the first to arrive
/// runs the initializer. Entries are dropped once their computation settles,
/// so the map only holds keys that are currently being worked on.
pub struct InflightRegistry<V> {
    pending: Mutex<HashMap<String, Arc<OnceCell<V>>>>,
}

impl<V> Default for InflightRegistry<V> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> InflightRegistry<V> {
    /// Returns the shared cell for `key`, creating it if nobody is working on it.
    pub fn join(&self, key: &str) -> Arc<OnceCell<V>> {
        let mut pending = self.pending.lock();
        pending
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Removes `key` if it still maps to `cell` and no other caller can still
    /// run its initializer. A failed initializer hands over to a waiting
    /// caller, so an uninitialized cell stays registered while anyone besides
    /// the registry and this caller holds it. A newer cell registered after
    /// this one settled is left alone.
    pub fn release(&self, key: &str, cell: &Arc<OnceCell<V>>) {
        let mut pending = self.pending.lock();
        let Some(current) = pending.get(key) else {
            return;
        };
        if !Arc::ptr_eq(current, cell) {
            return;
        }
        // One reference in the map, one held by the caller.
        if cell.initialized() || Arc::strong_count(cell) <= 2 {
            pending.remove(key);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }
}
