use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonically increasing count of transient failures. Clones share the same count so a host
/// can hold one for observability.
#[derive(Clone, Debug, Default)]
pub struct FailCounter {
    count: Arc<AtomicU64>,
}

impl FailCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
