use std::marker::PhantomData;

use crate::{
    CheckpointError, Effect, Snapshot,
    io::{IoTask, RecoveryResult, RecoveryTask},
};

use super::{
    driver::{Process, ProcessContext, ProcessIo},
    state::State,
};

pub(crate) struct Loading(PhantomData<()>);

impl Process for Loading {
    type Task = RecoveryTask;
    type TaskResult = RecoveryResult;
    type Emitted = ();
    type Input = ();
    type Finished = Result<State, CheckpointError>;
    type Results = Vec<IoTask<RecoveryTask>>;

    fn collect(_emitted: Vec<()>, tasks: Vec<IoTask<RecoveryTask>>) -> Self::Results {
        tasks
    }
}

/// Read the snapshot and log tail, restore the one and replay the other.
pub(crate) async fn load(
    mut state: State,
    cx: ProcessContext<Loading>,
) -> Result<State, CheckpointError> {
    let io = IoAccess(cx.io);

    let snapshot = io.load_snapshot().await?;
    let log = io.load_log().await?;
    state.set_now(cx.clock.now());

    if let Some(snapshot) = &snapshot {
        state.restore(snapshot)?;
    }
    for (index, effect) in log.iter().enumerate() {
        if let Err(e) = state.replay(effect) {
            tracing::error!(index, err=%e, "log does not follow from snapshot");
            return Err(e);
        }
    }
    tracing::info!(
        snapshot = snapshot.is_some(),
        replayed = log.len(),
        actors = state.space.len(),
        pending = state.queue.len(),
        "runtime recovered"
    );
    Ok(state)
}

struct IoAccess(ProcessIo<Loading>);

impl IoAccess {
    async fn load_snapshot(&self) -> Result<Option<Snapshot>, CheckpointError> {
        match self.0.request(RecoveryTask::LoadSnapshot).await {
            RecoveryResult::Snapshot(result) => result.map_err(CheckpointError::DurabilityRead),
            _ => panic!("unexpected recovery result for snapshot request"),
        }
    }

    async fn load_log(&self) -> Result<Vec<Effect>, CheckpointError> {
        match self.0.request(RecoveryTask::LoadLog).await {
            RecoveryResult::Log(result) => result.map_err(CheckpointError::DurabilityRead),
            _ => panic!("unexpected recovery result for log request"),
        }
    }
}
