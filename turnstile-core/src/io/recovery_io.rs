use crate::{DurabilityError, Effect, Snapshot};

/// Reads requested while a runtime is being recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryTask {
    /// Load the most recent snapshot, if there is one.
    LoadSnapshot,
    /// Load every effect logged since that snapshot, oldest first.
    LoadLog,
}

// The inverse of `RecoveryTask`
#[derive(Debug, Clone)]
pub enum RecoveryResult {
    Snapshot(Result<Option<Snapshot>, DurabilityError>),
    Log(Result<Vec<Effect>, DurabilityError>),
}
