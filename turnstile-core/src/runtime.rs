//! The live runtime: a sans-IO state machine around the turn loop.
use std::sync::{Arc, Mutex};

mod address_space;
pub use address_space::Context;
pub(crate) use address_space::AddressSpace;
mod checkpoint;
mod command;
pub(crate) use command::Command;
pub use command::{CommandId, CommandResult, DispatchedCommand};
pub(crate) mod driver;
mod executor;
mod io_access;
pub(crate) mod loading;
mod run;
use run::{RuntimeInput, RuntimeOutput};
mod run_state;
pub(crate) use run_state::RunState;
mod runtime_event;
pub use runtime_event::RuntimeEvent;
use runtime_event::RuntimeEventPayload;
mod runtime_results;
pub use runtime_results::{RuntimeResults, TurnFault};
mod scheduler;
pub(crate) use scheduler::Scheduler;
pub use scheduler::TurnPhase;
mod sequencer;
mod snapshot_manager;
mod sponsor;
pub(crate) mod state;
use state::State;
mod turn;
pub use turn::Turn;

use crate::{
    BehaviorRegistry, Event, Memento, RuntimeConfig, RuntimeLoader, Snapshot, Token,
    UnixTimestamp, io::{CheckpointIoResult, CheckpointIoTask, IoTask},
};

use driver::{Driver, Process, Stepped};

/// A checkpointing actor runtime.
///
/// Every message is processed in a turn whose complete effect (actors
/// created, messages sent, output for other domains and the actor's new
/// state) is written to the log before any of it is applied. The runtime
/// performs no IO of its own: the log writes it needs show up as
/// [`RuntimeResults::new_tasks`], and the caller reports their outcome with
/// [`RuntimeEvent::io_complete`].
pub struct Runtime {
    driver: Driver<Runtime>,
    state: Arc<Mutex<State>>,
}

impl Process for Runtime {
    type Task = CheckpointIoTask;
    type TaskResult = CheckpointIoResult;
    type Emitted = RuntimeOutput;
    type Input = RuntimeInput;
    type Finished = ();
    type Results = RuntimeResults;

    fn collect(emitted: Vec<RuntimeOutput>, tasks: Vec<IoTask<CheckpointIoTask>>) -> RuntimeResults {
        let mut results = RuntimeResults::default();
        for output in emitted {
            match output {
                RuntimeOutput::CommandCompleted { command_id, result } => {
                    results.completed_commands.insert(command_id, result);
                }
                RuntimeOutput::Deliver(output) => results.outbound.push(output),
                RuntimeOutput::TurnFault(fault) => results.turn_faults.push(fault),
                RuntimeOutput::DurabilityFailure(error) => {
                    results.durability_failures.push(error)
                }
            }
        }
        results.new_tasks.extend(tasks);
        results
    }
}

impl Runtime {
    /// Creates an empty runtime without reading anything from storage.
    ///
    /// Use [`Runtime::load`] to recover a runtime from its snapshot and log.
    pub fn new<R: rand::RngCore>(
        rng: &mut R,
        now: UnixTimestamp,
        config: RuntimeConfig,
        registry: BehaviorRegistry,
    ) -> Self {
        let state = State::new(rng, now, config, registry);
        Self::from_state(now, state)
    }

    pub(crate) fn from_state(now: UnixTimestamp, state: State) -> Self {
        let state = Arc::new(Mutex::new(state));
        let driver = Driver::start(now, |cx| run::run(cx, state.clone()));
        Runtime { driver, state }
    }

    /// Begins recovering a runtime from storage.
    ///
    /// Returns a [`RuntimeLoader`] which requests the latest snapshot and the
    /// log written since, restores the one and replays the other.
    pub fn load<R: rand::RngCore>(
        rng: &mut R,
        now: UnixTimestamp,
        config: RuntimeConfig,
        registry: BehaviorRegistry,
    ) -> RuntimeLoader {
        RuntimeLoader::new(rng, now, config, registry)
    }

    /// Processes an event and returns any resulting IO tasks, completed
    /// commands and output.
    #[tracing::instrument(skip(self), fields(event = %event), level = "trace")]
    pub fn handle_event(&mut self, now: UnixTimestamp, event: RuntimeEvent) -> RuntimeResults {
        if self.state.lock().unwrap().run_state() == RunState::Stopped {
            return RuntimeResults {
                stopped: true,
                ..Default::default()
            };
        }
        match event.payload {
            RuntimeEventPayload::IoComplete(result) => {
                self.driver.complete_task(now, result);
            }
            RuntimeEventPayload::Input(input) => {
                self.driver.push_input(now, input);
            }
        }
        match self.driver.step(now) {
            Stepped::Suspended(results) => results,
            Stepped::Finished(mut results, ()) => {
                self.state.lock().unwrap().set_run_state(RunState::Stopped);
                tracing::trace!("runtime stopped");
                results.stopped = true;
                results
            }
        }
    }

    /// The current memento of a live actor.
    pub fn actor(&self, token: &Token) -> Option<Memento> {
        self.state.lock().unwrap().actor(token)
    }

    /// Events waiting to be dispatched, the one in flight first.
    pub fn pending_events(&self) -> Vec<Event> {
        self.state.lock().unwrap().queue.to_vec()
    }

    /// An image of the runtime as it stands, without writing it anywhere.
    pub fn build_snapshot(&self) -> Snapshot {
        self.state.lock().unwrap().build_snapshot()
    }

    pub fn phase(&self) -> TurnPhase {
        self.state.lock().unwrap().phase()
    }

    /// Number of turns dispatched since this runtime was created or loaded.
    pub fn turns_dispatched(&self) -> u64 {
        self.state.lock().unwrap().scheduler.dispatched()
    }

    pub fn domain(&self) -> String {
        self.state.lock().unwrap().config.domain.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().unwrap().run_state() == RunState::Stopped
    }
}
