use crate::{
    CheckpointError, Output,
    runtime::{CommandId, CommandResult, TurnFault},
};

#[derive(Debug)]
pub(crate) enum RuntimeOutput {
    CommandCompleted {
        command_id: CommandId,
        result: CommandResult,
    },
    Deliver(Output),
    TurnFault(TurnFault),
    DurabilityFailure(CheckpointError),
}
