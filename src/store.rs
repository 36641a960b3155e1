use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::types::PortResult;

#[derive(Debug, Default, Clone)]
struct StoreInner {
    results: BTreeMap<u16, PortResult>,
    closed_count: u64,
}

/// Per-session accumulator shared by all probe units of one scan.
///
/// Every write takes the lock, so at most one unit mutates the map and the
/// closed counter at a time. A fresh store is created for each scan.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for one port. Returns `false` and leaves the store
    /// untouched if that port already has a result.
    pub async fn record(&self, result: PortResult) -> bool {
        let mut guard = self.inner.lock().await;
        if guard.results.contains_key(&result.port) {
            warn!(port = result.port, "duplicate result ignored");
            return false;
        }
        if !result.is_open() {
            guard.closed_count += 1;
        }
        guard.results.insert(result.port, result);
        true
    }

    /// Consume the store once every writer has joined, yielding the results and closed count.
    pub async fn finish(self) -> (BTreeMap<u16, PortResult>, u64) {
        let inner = match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex.into_inner(),
            // Another handle is still alive; copy out under the lock.
            Err(shared) => shared.lock().await.clone(),
        };
        (inner.results, inner.closed_count)
    }
}
