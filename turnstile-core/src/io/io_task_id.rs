use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies an outstanding [`IoTask`](super::IoTask) so its result can be
/// routed back to whoever requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IoTaskId(u64);

static NEXT: AtomicU64 = AtomicU64::new(1);

impl IoTaskId {
    pub(crate) fn new() -> Self {
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for IoTaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "io-{}", self.0)
    }
}
