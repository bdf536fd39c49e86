use crate::{
    DurabilityError, Effect, Snapshot,
    io::{CheckpointIoResult, CheckpointIoTask},
};

use super::{Runtime, driver::ProcessIo, run::RuntimeOutput};

#[derive(Clone)]
pub(crate) struct IoAccess {
    io: ProcessIo<Runtime>,
}

impl IoAccess {
    pub(crate) fn new(io: ProcessIo<Runtime>) -> Self {
        Self { io }
    }

    pub(crate) async fn log_effect(&self, effect: Effect) -> Result<(), DurabilityError> {
        match self
            .io
            .request(CheckpointIoTask::LogEffect { effect })
            .await
        {
            CheckpointIoResult::LogEffect(result) => result,
            other => panic!("unexpected IO result for LogEffect: {other:?}"),
        }
    }

    pub(crate) async fn log_snapshot(&self, snapshot: Snapshot) -> Result<(), DurabilityError> {
        match self
            .io
            .request(CheckpointIoTask::LogSnapshot { snapshot })
            .await
        {
            CheckpointIoResult::LogSnapshot(result) => result,
            other => panic!("unexpected IO result for LogSnapshot: {other:?}"),
        }
    }

    pub(crate) fn emit(&self, output: RuntimeOutput) {
        self.io.emit(output);
    }
}
