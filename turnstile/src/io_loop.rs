use std::sync::{Arc, Mutex};

use futures::{StreamExt, channel::mpsc, stream::FuturesUnordered};
use turnstile_core::{
    RuntimeEvent,
    io::{CheckpointIoResult, CheckpointIoTask, IoResult, IoTask, RecoveryResult, RecoveryTask},
};

use crate::{Inner, storage::Storage};

/// Executes the durable writes the runtime asks for and feeds the results
/// back into it. Exits once the runtime has stopped and dropped its end of
/// the channel.
#[tracing::instrument(skip(inner, storage, rx))]
pub(crate) async fn io_loop<S: Storage>(
    domain: String,
    inner: Arc<Mutex<Inner>>,
    storage: S,
    mut rx: mpsc::UnboundedReceiver<IoTask<CheckpointIoTask>>,
) {
    let mut running_tasks = FuturesUnordered::new();

    loop {
        futures::select! {
            next_task = rx.next() => {
                let Some(IoTask { task_id, action }) = next_task else {
                    tracing::trace!("io loop channel closed, exiting");
                    break;
                };
                tracing::trace!(%task_id, "received task");
                let storage = storage.clone();
                running_tasks.push(async move {
                    let payload = dispatch_checkpoint_task(storage, action).await;
                    IoResult { task_id, payload }
                });
            }
            result = running_tasks.select_next_some() => {
                inner.lock().unwrap().handle_event(RuntimeEvent::io_complete(result));
            }
        }
    }

    while let Some(result) = running_tasks.next().await {
        inner
            .lock()
            .unwrap()
            .handle_event(RuntimeEvent::io_complete(result));
    }
}

pub(crate) async fn dispatch_checkpoint_task<S: Storage>(
    storage: S,
    task: CheckpointIoTask,
) -> CheckpointIoResult {
    match task {
        CheckpointIoTask::LogEffect { effect } => {
            CheckpointIoResult::LogEffect(storage.append_effect(effect).await.map_err(Into::into))
        }
        CheckpointIoTask::LogSnapshot { snapshot } => CheckpointIoResult::LogSnapshot(
            storage.write_snapshot(snapshot).await.map_err(Into::into),
        ),
    }
}

pub(crate) async fn dispatch_recovery_task<S: Storage>(
    storage: S,
    task: RecoveryTask,
) -> RecoveryResult {
    match task {
        RecoveryTask::LoadSnapshot => {
            RecoveryResult::Snapshot(storage.load_snapshot().await.map_err(Into::into))
        }
        RecoveryTask::LoadLog => RecoveryResult::Log(storage.load_log().await.map_err(Into::into)),
    }
}
