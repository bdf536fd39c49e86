use crate::runtime::{Command, CommandId};

#[derive(Debug, Clone)]
pub(crate) enum RuntimeInput {
    Command {
        command_id: CommandId,
        command: Box<Command>,
    },
    Tick,
    Resume,
    Stop,
}
