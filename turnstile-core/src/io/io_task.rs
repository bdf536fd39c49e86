use super::IoTaskId;

/// Storage work the host must perform on the runtime's behalf. The result is
/// handed back as an [`IoResult`](super::IoResult) carrying the same id.
#[derive(Debug, Clone, PartialEq)]
pub struct IoTask<Action> {
    pub task_id: IoTaskId,
    pub action: Action,
}
