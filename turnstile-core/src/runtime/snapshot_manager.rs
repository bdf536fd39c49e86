use crate::{CheckpointError, DurabilityError, Effect, Snapshot};

use super::{CommandId, CommandResult, io_access::IoAccess, run::RuntimeOutput, state::State};

impl State {
    /// One memento per live actor plus every pending event, in order.
    ///
    /// The event currently being processed, if any, is still at the head of
    /// the queue and so is included.
    pub(crate) fn build_snapshot(&self) -> Snapshot {
        Snapshot {
            created: self.space.mementos(),
            sent: self.queue.to_vec(),
            next_seq: Some(self.sequencer.next_seq()),
        }
    }

    /// Replace the address space and queue with the contents of `snapshot`.
    ///
    /// Every actor is first created as a placeholder so that state which
    /// refers to other actors by token always refers to something which
    /// exists, then each placeholder is overwritten with its memento.
    pub(crate) fn restore(&mut self, snapshot: &Snapshot) -> Result<(), CheckpointError> {
        for memento in snapshot.created.values() {
            self.registry.check(&memento.behavior)?;
        }
        self.space.clear();
        self.queue.clear();
        for token in snapshot.created.keys() {
            self.space.insert_placeholder(token.clone());
        }
        for memento in snapshot.created.values() {
            self.space.overwrite(memento);
        }
        self.queue.extend(snapshot.sent.iter().cloned());

        self.sequencer.reset(snapshot.next_seq.unwrap_or(0));
        for event in &snapshot.sent {
            self.sequencer.observe(event);
        }
        self.commits_since_snapshot = 0;
        tracing::debug!(
            actors = self.space.len(),
            pending = self.queue.len(),
            next_seq = self.sequencer.next_seq(),
            "restored snapshot"
        );
        Ok(())
    }

    /// Apply an effect read back from the log.
    ///
    /// The effect's cause must be the event at the head of the queue,
    /// otherwise this fails with `ReplayIntegrity` and changes nothing.
    /// Outputs are not delivered again.
    pub(crate) fn replay(&mut self, effect: &Effect) -> Result<(), CheckpointError> {
        let outputs = self.apply_effect(effect)?;
        if !effect.is_empty() {
            self.commits_since_snapshot += 1;
        }
        tracing::trace!(
            cause=?effect.cause.as_ref().map(|e| e.id()),
            skipped_outputs = outputs.len(),
            "replayed effect"
        );
        Ok(())
    }

    /// A snapshot to write now, if one was requested or the periodic
    /// threshold has been reached.
    pub(crate) fn snapshot_due(&self) -> Option<Snapshot> {
        let periodic = self
            .config
            .snapshot_every
            .is_some_and(|n| self.commits_since_snapshot >= n.get());
        if periodic || !self.snapshot_waiters.is_empty() {
            Some(self.build_snapshot())
        } else {
            None
        }
    }

    pub(crate) fn snapshot_logged(
        &mut self,
        io: &IoAccess,
        snapshot: Snapshot,
        waiters: Vec<CommandId>,
        result: Result<(), DurabilityError>,
    ) {
        // A failed snapshot is not retried until the next period, the log
        // still holds everything
        self.commits_since_snapshot = 0;
        match result {
            Ok(()) => {
                tracing::debug!(
                    actors = snapshot.created.len(),
                    pending = snapshot.sent.len(),
                    "snapshot written"
                );
                for command_id in waiters {
                    io.emit(RuntimeOutput::CommandCompleted {
                        command_id,
                        result: CommandResult::SnapshotTaken {
                            snapshot: snapshot.clone(),
                        },
                    });
                }
            }
            Err(e) => {
                let error = CheckpointError::DurabilityWrite(e);
                tracing::error!(err=%error, "failed to write snapshot");
                io.emit(RuntimeOutput::DurabilityFailure(error.clone()));
                for command_id in waiters {
                    io.emit(RuntimeOutput::CommandCompleted {
                        command_id,
                        result: CommandResult::Failed {
                            error: error.clone(),
                        },
                    });
                }
            }
        }
    }
}
