use super::IoTaskId;

#[derive(Debug, Clone)]
pub struct IoResult<Payload> {
    /// The id of the [`IoTask`](super::IoTask) this completes.
    pub task_id: IoTaskId,
    pub payload: Payload,
}
