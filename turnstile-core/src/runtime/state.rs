use rand::{SeedableRng, rngs::StdRng};

use crate::{
    Behavior, BehaviorRegistry, Effect, EffectAccumulator, EventQueue, Memento, RuntimeConfig,
    Token, UnixTimestamp, Value, marshal,
};

use super::{
    AddressSpace, Command, CommandId, CommandResult, RunState, Scheduler, TurnPhase,
    checkpoint::{Origin, PendingCommit},
    sequencer::Sequencer,
    sponsor::Sponsor,
    turn,
};

/// Everything a runtime owns.
///
/// Only the run loop and the loader touch this, and neither holds the lock
/// across a suspension point.
pub(crate) struct State {
    pub(crate) config: RuntimeConfig,
    pub(crate) registry: BehaviorRegistry,
    pub(crate) space: AddressSpace,
    pub(crate) queue: EventQueue,
    pub(crate) sequencer: Sequencer,
    pub(crate) scheduler: Scheduler,
    rng: StdRng,
    turn_effect: EffectAccumulator,
    host_effect: EffectAccumulator,
    host_waiters: Vec<(CommandId, CommandResult)>,
    /// An effect the log refused, retried on resume.
    pub(crate) stalled: Option<PendingCommit>,
    pub(crate) snapshot_waiters: Vec<CommandId>,
    pub(crate) commits_since_snapshot: u64,
    run_state: RunState,
}

/// What the run loop should do next.
pub(crate) enum Step {
    Commit(PendingCommit),
    Snapshot {
        snapshot: crate::Snapshot,
        waiters: Vec<CommandId>,
    },
    Idle,
}

impl State {
    pub(crate) fn new<R: rand::RngCore>(
        rng: &mut R,
        now: UnixTimestamp,
        config: RuntimeConfig,
        registry: BehaviorRegistry,
    ) -> Self {
        config.validate();
        Self {
            sequencer: Sequencer::new(config.domain.clone(), now),
            config,
            registry,
            space: AddressSpace::default(),
            queue: EventQueue::new(),
            scheduler: Scheduler::default(),
            rng: StdRng::from_rng(rng),
            turn_effect: EffectAccumulator::new(),
            host_effect: EffectAccumulator::new(),
            host_waiters: Vec::new(),
            stalled: None,
            snapshot_waiters: Vec::new(),
            commits_since_snapshot: 0,
            run_state: RunState::Running,
        }
    }

    pub(crate) fn run_state(&self) -> RunState {
        self.run_state
    }

    pub(crate) fn set_run_state(&mut self, run_state: RunState) {
        self.run_state = run_state;
    }

    pub(crate) fn set_now(&mut self, now: UnixTimestamp) {
        self.sequencer.set_now(now);
    }

    pub(crate) fn phase(&self) -> TurnPhase {
        self.scheduler.phase()
    }

    pub(crate) fn actor(&self, token: &Token) -> Option<Memento> {
        self.space.get(token).map(|ctx| ctx.memento())
    }

    /// Handle a command from the host. Returns a result if the command
    /// completes immediately, otherwise the result is reported once the
    /// host effect has been committed.
    pub(crate) fn handle_command(
        &mut self,
        command_id: CommandId,
        command: Command,
    ) -> Option<CommandResult> {
        match command {
            Command::CreateActor {
                behavior,
                state,
                token,
            } => self.host_create(command_id, behavior, state, token),
            Command::Send { token, message } => self.host_send(command_id, token, message),
            Command::Receive { address, content } => {
                if !address.is_local_to(&self.config.domain) {
                    return Some(CommandResult::Rejected {
                        reason: format!("{address} is not a local actor"),
                    });
                }
                match marshal::decode(&content) {
                    Ok(message) => self.host_send(command_id, address, message),
                    Err(e) => {
                        tracing::warn!(%address, err=%e, "dropping undecodable message");
                        Some(CommandResult::Rejected {
                            reason: e.to_string(),
                        })
                    }
                }
            }
            Command::TakeSnapshot => {
                self.snapshot_waiters.push(command_id);
                None
            }
        }
    }

    fn host_sponsor(&mut self) -> Sponsor<'_> {
        if !self.host_effect.is_active() {
            // cannot fail, we just checked there is no active effect
            let _ = self.host_effect.begin(None);
        }
        Sponsor {
            effect: &mut self.host_effect,
            sequencer: &mut self.sequencer,
            rng: &mut self.rng,
            registry: &self.registry,
            space: &self.space,
            stalled: self.stalled.as_ref().map(|pending| &pending.effect),
        }
    }

    fn host_create(
        &mut self,
        command_id: CommandId,
        behavior: Behavior,
        state: Value,
        token: Option<Token>,
    ) -> Option<CommandResult> {
        let created = self.host_sponsor().create(behavior, state, token);
        match created {
            Ok(token) => {
                tracing::trace!(%token, "host created actor");
                self.host_waiters
                    .push((command_id, CommandResult::ActorCreated { token }));
                None
            }
            Err(e) => Some(CommandResult::Rejected {
                reason: e.to_string(),
            }),
        }
    }

    fn host_send(
        &mut self,
        command_id: CommandId,
        token: Token,
        message: Value,
    ) -> Option<CommandResult> {
        let sent = self.host_sponsor().send(token, message);
        match sent {
            Ok(()) => {
                self.host_waiters.push((command_id, CommandResult::Sent));
                None
            }
            Err(e) => Some(CommandResult::Rejected {
                reason: e.to_string(),
            }),
        }
    }

    /// Decide what the run loop does next.
    ///
    /// A write refused earlier is retried first, then anything the host
    /// did since the last turn is committed, then pending snapshots are
    /// taken, and only then is the next event dispatched.
    pub(crate) fn next_step(&mut self) -> Step {
        if self.scheduler.phase() == TurnPhase::Failed {
            return Step::Idle;
        }
        if let Some(pending) = self.stalled.take() {
            return Step::Commit(pending);
        }
        if self.host_effect.is_active() {
            return match self.host_effect.finish() {
                Ok(effect) => Step::Commit(PendingCommit {
                    effect,
                    origin: Origin::Host {
                        waiters: std::mem::take(&mut self.host_waiters),
                    },
                }),
                Err(e) => panic!("{e}"),
            };
        }
        if let Some(snapshot) = self.snapshot_due() {
            return Step::Snapshot {
                snapshot,
                waiters: std::mem::take(&mut self.snapshot_waiters),
            };
        }
        match self.schedule() {
            Some(effect) => Step::Commit(PendingCommit {
                effect,
                origin: Origin::Turn,
            }),
            None => Step::Idle,
        }
    }

    /// Begin a turn for the event at the head of the queue, if the
    /// scheduler is idle and there is one.
    ///
    /// The event stays at the head of the queue until its effect is
    /// applied.
    pub(crate) fn schedule(&mut self) -> Option<Effect> {
        if !self.scheduler.is_idle() {
            return None;
        }
        let event = self.queue.peek()?.clone();
        if let Err(e) = self.scheduler.begin_turn() {
            panic!("{e}");
        }
        tracing::trace!(token=%event.token, seq=event.seq, "dispatching event");
        let result = self.turn_effect.begin(Some(event.clone())).and_then(|_| {
            let sponsor = Sponsor {
                effect: &mut self.turn_effect,
                sequencer: &mut self.sequencer,
                rng: &mut self.rng,
                registry: &self.registry,
                space: &self.space,
                stalled: self.stalled.as_ref().map(|pending| &pending.effect),
            };
            turn::run_turn(&event, sponsor)
        });
        if let Err(e) = result {
            panic!("{e}");
        }
        match self.turn_effect.finish() {
            Ok(effect) => Some(effect),
            Err(e) => panic!("{e}"),
        }
    }

    /// Reject every command still waiting for a commit.
    pub(crate) fn reject_waiting(&mut self, reason: &str) -> Vec<(CommandId, CommandResult)> {
        let mut rejected = Vec::new();
        let host = std::mem::take(&mut self.host_waiters);
        let stalled = match self.stalled.take() {
            Some(PendingCommit {
                origin: Origin::Host { waiters },
                ..
            }) => waiters,
            _ => Vec::new(),
        };
        for (command_id, _) in stalled.into_iter().chain(host) {
            rejected.push((
                command_id,
                CommandResult::Rejected {
                    reason: reason.to_string(),
                },
            ));
        }
        for command_id in std::mem::take(&mut self.snapshot_waiters) {
            rejected.push((
                command_id,
                CommandResult::Rejected {
                    reason: reason.to_string(),
                },
            ));
        }
        rejected
    }
}
