use crate::{DurabilityError, Effect, Snapshot};

/// Durable writes requested by a running runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckpointIoTask {
    /// Append an effect to the log. The runtime applies nothing from the
    /// effect until this has succeeded.
    LogEffect { effect: Effect },
    /// Persist a snapshot. Once this succeeds, loading the log must only
    /// return effects logged after it.
    LogSnapshot { snapshot: Snapshot },
}

#[derive(Debug, Clone)]
pub enum CheckpointIoResult {
    LogEffect(Result<(), DurabilityError>),
    LogSnapshot(Result<(), DurabilityError>),
}
