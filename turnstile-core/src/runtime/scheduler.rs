use crate::CheckpointError;

/// Where the runtime is in the processing of one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    /// A behavior is running.
    Process,
    /// Waiting for the log to acknowledge an effect.
    Logging,
    /// Applying a logged effect to the address space and queue.
    Applying,
    /// The log refused an effect. Nothing is dispatched until the host
    /// resumes the runtime.
    Failed,
}

/// Enforces that at most one turn is in flight.
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    phase: TurnPhase,
    dispatched: u64,
}

impl Scheduler {
    pub(crate) fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.phase == TurnPhase::Idle
    }

    pub(crate) fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub(crate) fn begin_turn(&mut self) -> Result<(), CheckpointError> {
        if self.phase != TurnPhase::Idle {
            return Err(CheckpointError::DispatchReentry {
                in_flight: self.phase,
            });
        }
        self.dispatched += 1;
        self.transition(TurnPhase::Process);
        Ok(())
    }

    pub(crate) fn begin_logging(&mut self) {
        assert!(
            matches!(self.phase, TurnPhase::Idle | TurnPhase::Process),
            "cannot log an effect in phase {:?}",
            self.phase
        );
        self.transition(TurnPhase::Logging);
    }

    pub(crate) fn begin_applying(&mut self) {
        assert!(
            self.phase != TurnPhase::Applying && self.phase != TurnPhase::Failed,
            "cannot apply an effect in phase {:?}",
            self.phase
        );
        self.transition(TurnPhase::Applying);
    }

    pub(crate) fn complete(&mut self) {
        assert_eq!(self.phase, TurnPhase::Applying);
        self.transition(TurnPhase::Idle);
    }

    pub(crate) fn fail(&mut self) {
        assert_eq!(self.phase, TurnPhase::Logging);
        self.transition(TurnPhase::Failed);
    }

    /// Leave the failed phase. Returns false if the runtime had not failed.
    pub(crate) fn resume(&mut self) -> bool {
        if self.phase != TurnPhase::Failed {
            return false;
        }
        self.transition(TurnPhase::Idle);
        true
    }

    fn transition(&mut self, to: TurnPhase) {
        tracing::trace!(from=?self.phase, ?to, "turn phase");
        self.phase = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_second_turn_cannot_begin_while_one_is_in_flight() {
        let mut scheduler = Scheduler::default();
        scheduler.begin_turn().unwrap();
        assert_eq!(
            scheduler.begin_turn(),
            Err(CheckpointError::DispatchReentry {
                in_flight: TurnPhase::Process
            })
        );
        scheduler.begin_logging();
        assert_eq!(
            scheduler.begin_turn(),
            Err(CheckpointError::DispatchReentry {
                in_flight: TurnPhase::Logging
            })
        );
        scheduler.begin_applying();
        assert!(scheduler.begin_turn().is_err());
        scheduler.complete();
        scheduler.begin_turn().unwrap();
        assert_eq!(scheduler.dispatched(), 2);
    }

    #[test]
    fn failed_phase_blocks_dispatch_until_resumed() {
        let mut scheduler = Scheduler::default();
        assert!(!scheduler.resume());
        scheduler.begin_turn().unwrap();
        scheduler.begin_logging();
        scheduler.fail();
        assert_eq!(
            scheduler.begin_turn(),
            Err(CheckpointError::DispatchReentry {
                in_flight: TurnPhase::Failed
            })
        );
        assert!(scheduler.resume());
        assert!(scheduler.is_idle());
    }
}
