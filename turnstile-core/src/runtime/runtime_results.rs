use std::collections::HashMap;

use crate::{
    CheckpointError, EventId, Output, Token, TurnException,
    io::{CheckpointIoTask, IoTask},
};

use super::{CommandId, CommandResult};

/// Results returned from processing an event in the `Runtime`
#[derive(Debug, Default)]
pub struct RuntimeResults {
    /// IO tasks that must be executed by the calling application.
    pub new_tasks: Vec<IoTask<CheckpointIoTask>>,

    /// Commands that have completed execution.
    pub completed_commands: HashMap<CommandId, CommandResult>,

    /// Messages for other domains, in commit order. Each one belongs to an
    /// effect which has been logged and applied.
    pub outbound: Vec<Output>,

    /// Turns which were aborted by their behavior or addressed to an actor
    /// which does not exist.
    pub turn_faults: Vec<TurnFault>,

    /// Writes the storage layer refused.
    pub durability_failures: Vec<CheckpointError>,

    /// Indicates whether the runtime is stopped.
    pub stopped: bool,
}

/// A committed turn which ended in an exception.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnFault {
    pub token: Token,
    pub cause: EventId,
    pub exception: TurnException,
}
