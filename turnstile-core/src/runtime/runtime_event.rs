use crate::{
    Behavior, Token, Value,
    io::{CheckpointIoResult, IoResult},
};

use super::{Command, CommandId, DispatchedCommand, RuntimeInput};

/// An event that can be processed by a [`Runtime`](super::Runtime).
///
/// Events are created using the static methods on this struct.
#[derive(Debug)]
pub struct RuntimeEvent {
    pub(crate) payload: RuntimeEventPayload,
}

#[derive(Debug)]
pub(crate) enum RuntimeEventPayload {
    // A durable write has completed
    IoComplete(IoResult<CheckpointIoResult>),
    Input(RuntimeInput),
}

impl RuntimeEvent {
    /// Creates an event indicating that an IO operation has completed.
    pub fn io_complete(result: IoResult<CheckpointIoResult>) -> Self {
        RuntimeEvent {
            payload: RuntimeEventPayload::IoComplete(result),
        }
    }

    /// Gives the runtime a chance to make progress without new input, e.g.
    /// to dispatch events restored from a snapshot.
    pub fn tick() -> Self {
        RuntimeEvent {
            payload: RuntimeEventPayload::Input(RuntimeInput::Tick),
        }
    }

    /// Creates an actor with a freshly generated token.
    ///
    /// Completes with [`CommandResult::ActorCreated`](super::CommandResult)
    /// once the creation has been logged.
    pub fn create_actor<V: Into<Value>>(behavior: Behavior, state: V) -> DispatchedCommand {
        Self::dispatch_command(Command::CreateActor {
            behavior,
            state: state.into(),
            token: None,
        })
    }

    /// Creates an actor bound to a token chosen by the caller. The token must
    /// be in the local domain and not already in use.
    pub fn create_actor_with_token<V: Into<Value>>(
        token: Token,
        behavior: Behavior,
        state: V,
    ) -> DispatchedCommand {
        Self::dispatch_command(Command::CreateActor {
            behavior,
            state: state.into(),
            token: Some(token),
        })
    }

    /// Sends a message from outside the runtime.
    pub fn send<V: Into<Value>>(token: Token, message: V) -> DispatchedCommand {
        Self::dispatch_command(Command::Send {
            token,
            message: message.into(),
        })
    }

    /// Delivers a message in wire form which arrived from the transport.
    pub fn receive<S: Into<String>>(address: Token, content: S) -> DispatchedCommand {
        Self::dispatch_command(Command::Receive {
            address,
            content: content.into(),
        })
    }

    /// Takes a snapshot and writes it to the snapshot store.
    pub fn take_snapshot() -> DispatchedCommand {
        Self::dispatch_command(Command::TakeSnapshot)
    }

    /// Leaves the failed phase entered after a refused write, retrying that
    /// write.
    pub fn resume() -> Self {
        RuntimeEvent {
            payload: RuntimeEventPayload::Input(RuntimeInput::Resume),
        }
    }

    pub fn stop() -> Self {
        RuntimeEvent {
            payload: RuntimeEventPayload::Input(RuntimeInput::Stop),
        }
    }

    fn dispatch_command(command: Command) -> DispatchedCommand {
        let command_id = CommandId::new();
        DispatchedCommand {
            command_id,
            event: RuntimeEvent {
                payload: RuntimeEventPayload::Input(RuntimeInput::Command {
                    command_id,
                    command: Box::new(command),
                }),
            },
        }
    }
}

impl std::fmt::Display for RuntimeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.payload)
    }
}
