use super::CommandId;
use crate::runtime::RuntimeEvent;

/// An event carrying a command, along with the ID its result will be
/// reported under.
#[derive(Debug)]
pub struct DispatchedCommand {
    pub command_id: CommandId,
    pub event: RuntimeEvent,
}
