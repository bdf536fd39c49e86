use turnstile_core::CheckpointError;

use crate::Stopped;

/// A command the runtime did not carry out.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// The command was refused before anything was logged, for example a
    /// create with an unregistered behavior.
    #[error("command rejected: {0}")]
    Rejected(String),
    /// The command was accepted but its effect could not be made durable.
    #[error(transparent)]
    Failed(CheckpointError),
    #[error(transparent)]
    Stopped(#[from] Stopped),
}

/// Recovery from storage failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("failed to load runtime: {0}")]
pub struct LoadError(#[from] pub CheckpointError);
