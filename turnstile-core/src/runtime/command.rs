use crate::{Behavior, CheckpointError, Snapshot, Token, Value};

mod command_id;
pub use command_id::CommandId;
mod dispatched_command;
pub use dispatched_command::DispatchedCommand;

/// Operations the host asks of the runtime.
///
/// Commands are created through the static methods on
/// [`RuntimeEvent`](super::RuntimeEvent), which assign each one a
/// [`CommandId`]. Creates and sends are gathered into a single effect with no
/// cause, which is logged and applied before the next event is dispatched.
/// Their results are reported once that effect has been committed.
#[derive(Debug, Clone)]
pub(crate) enum Command {
    CreateActor {
        behavior: Behavior,
        state: Value,
        token: Option<Token>,
    },
    Send {
        token: Token,
        message: Value,
    },
    /// A message in wire form which arrived for a local actor.
    Receive {
        address: Token,
        content: String,
    },
    TakeSnapshot,
}

/// The outcome of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    ActorCreated { token: Token },
    Sent,
    SnapshotTaken { snapshot: Snapshot },
    /// The command was invalid. Nothing was logged.
    Rejected { reason: String },
    /// The command was valid but the storage layer failed.
    Failed { error: CheckpointError },
}
