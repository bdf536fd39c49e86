use std::sync::{Arc, Mutex};

use crate::{CheckpointError, DurabilityError, DurabilityPolicy, Effect, Output};

use super::{
    CommandId, CommandResult, TurnFault, io_access::IoAccess, run::RuntimeOutput, state::State,
};

/// An effect on its way to the log.
#[derive(Debug)]
pub(crate) struct PendingCommit {
    pub(crate) effect: Effect,
    pub(crate) origin: Origin,
}

#[derive(Debug)]
pub(crate) enum Origin {
    /// The effect of dispatching the event at the head of the queue.
    Turn,
    /// Creates and sends made by the host, with the results to report to
    /// each command once the effect is committed.
    Host {
        waiters: Vec<(CommandId, CommandResult)>,
    },
}

pub(crate) enum Checkpointed {
    Committed,
    Halted,
    Aborted,
}

/// Write `pending` to the log and apply it once the write has succeeded.
///
/// An empty effect is applied without touching the log. Nothing in the
/// address space or queue changes before the log acknowledges the write.
pub(crate) async fn save_checkpoint(
    io: &IoAccess,
    state: &Arc<Mutex<State>>,
    pending: PendingCommit,
) -> Checkpointed {
    if !pending.effect.is_empty() {
        state.lock().unwrap().scheduler.begin_logging();
        let logged = io.log_effect(pending.effect.clone()).await;
        if let Err(error) = logged {
            return state.lock().unwrap().durability_failed(io, pending, error);
        }
    }
    state.lock().unwrap().commit(io, pending);
    Checkpointed::Committed
}

impl State {
    /// Apply an effect which is already in the log.
    ///
    /// Consumes the effect's cause from the head of the queue. Unless the
    /// turn raised an exception, materializes created actors, installs the
    /// post-image and enqueues sent events, returning the outputs to
    /// deliver. If the cause does not match the head of the queue nothing is
    /// changed.
    pub(crate) fn apply_effect(&mut self, effect: &Effect) -> Result<Vec<Output>, CheckpointError> {
        if let Some(cause) = &effect.cause {
            let head = self.queue.peek().map(|e| e.id());
            if head.as_ref() != Some(&cause.id()) {
                return Err(CheckpointError::ReplayIntegrity {
                    expected: head,
                    found: Some(cause.id()),
                });
            }
            self.queue.pop();
        }
        for event in &effect.sent {
            self.sequencer.observe(event);
        }
        if effect.is_exception() {
            return Ok(Vec::new());
        }
        for memento in effect.created.values() {
            self.space.overwrite(memento);
        }
        if let Some(update) = &effect.update {
            self.space.overwrite(update);
        }
        self.queue.extend(effect.sent.iter().cloned());
        Ok(effect.output.clone())
    }

    fn commit(&mut self, io: &IoAccess, pending: PendingCommit) {
        let PendingCommit { effect, origin } = pending;
        self.scheduler.begin_applying();
        let outputs = match self.apply_effect(&effect) {
            Ok(outputs) => outputs,
            Err(e) => panic!("applying a freshly logged effect failed: {e}"),
        };
        if !effect.is_empty() {
            self.commits_since_snapshot += 1;
        }
        tracing::debug!(
            cause=?effect.cause.as_ref().map(|e| e.id()),
            created=effect.created.len(),
            sent=effect.sent.len(),
            output=outputs.len(),
            "committed effect"
        );
        if let (Some(cause), Some(exception)) = (&effect.cause, &effect.exception) {
            tracing::warn!(token=%cause.token, %exception, "turn aborted");
            io.emit(RuntimeOutput::TurnFault(TurnFault {
                token: cause.token.clone(),
                cause: cause.id(),
                exception: exception.clone(),
            }));
        }
        for output in outputs {
            io.emit(RuntimeOutput::Deliver(output));
        }
        if let Origin::Host { waiters } = origin {
            for (command_id, result) in waiters {
                io.emit(RuntimeOutput::CommandCompleted { command_id, result });
            }
        }
        self.scheduler.complete();
    }

    fn durability_failed(
        &mut self,
        io: &IoAccess,
        pending: PendingCommit,
        error: DurabilityError,
    ) -> Checkpointed {
        let error = CheckpointError::DurabilityWrite(error);
        tracing::error!(
            cause=?pending.effect.cause.as_ref().map(|e| e.id()),
            err=%error,
            policy=?self.config.durability_policy,
            "failed to log effect"
        );
        self.scheduler.fail();
        io.emit(RuntimeOutput::DurabilityFailure(error.clone()));
        match self.config.durability_policy {
            DurabilityPolicy::Halt => {
                self.stalled = Some(pending);
                Checkpointed::Halted
            }
            DurabilityPolicy::Abort => {
                if let Origin::Host { waiters } = pending.origin {
                    for (command_id, _) in waiters {
                        io.emit(RuntimeOutput::CommandCompleted {
                            command_id,
                            result: CommandResult::Failed {
                                error: error.clone(),
                            },
                        });
                    }
                }
                Checkpointed::Aborted
            }
        }
    }

    /// Leave the failed phase. The refused write is retried on the next
    /// step.
    pub(crate) fn resume(&mut self) {
        if self.scheduler.resume() {
            tracing::info!(retrying = self.stalled.is_some(), "resuming after durability failure");
        } else {
            tracing::debug!("resume requested but runtime has not failed");
        }
    }
}
