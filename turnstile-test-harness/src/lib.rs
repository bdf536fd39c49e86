//! A synchronous, deterministic driver for `turnstile-core`.
//!
//! [`RuntimeHarness`] executes every IO task against a [`MemoryStore`]
//! immediately, runs on a fixed clock and a seeded RNG, and can be told to
//! refuse writes.
use std::collections::{HashMap, VecDeque};

use rand::{SeedableRng, rngs::StdRng};
use turnstile_core::{
    Behavior, BehaviorRegistry, CheckpointError, CommandId, CommandResult, DurabilityError,
    Event, LoaderState, Memento, Output, Runtime, RuntimeConfig, RuntimeEvent, RuntimeLoader,
    Snapshot, Token, UnixTimestamp, Value,
    io::{CheckpointIoResult, CheckpointIoTask, IoResult, IoTask, RecoveryResult, RecoveryTask},
    runtime::{DispatchedCommand, TurnFault, TurnPhase},
};

pub mod behaviors;
mod memory_store;
pub use memory_store::MemoryStore;

const START: u64 = 1_700_000_000_000;

pub struct RuntimeHarness {
    runtime: Box<Runtime>,
    store: MemoryStore,
    now: UnixTimestamp,
    inbox: VecDeque<RuntimeEvent>,
    tasks: VecDeque<IoTask<CheckpointIoTask>>,
    completed: HashMap<CommandId, CommandResult>,
    outbound: Vec<Output>,
    turn_faults: Vec<TurnFault>,
    durability_failures: Vec<CheckpointError>,
    fail_log_writes: usize,
    fail_snapshot_writes: usize,
    effects_written: usize,
    stopped: bool,
}

impl RuntimeHarness {
    /// A fresh runtime in the default domain with every behavior from
    /// [`behaviors`].
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default(), behaviors::registry())
    }

    pub fn with_config(config: RuntimeConfig, registry: BehaviorRegistry) -> Self {
        match Self::recover(MemoryStore::new(), config, registry) {
            Ok(harness) => harness,
            Err(e) => panic!("recovering from an empty store failed: {e}"),
        }
    }

    /// Recover a runtime from `store`, as a restarted process would.
    pub fn recover(
        store: MemoryStore,
        config: RuntimeConfig,
        registry: BehaviorRegistry,
    ) -> Result<Self, CheckpointError> {
        let now = UnixTimestamp::from_millis(START);
        // A runtime recovered from a later image must not mint the tokens
        // its predecessor already handed out
        let mut rng = StdRng::seed_from_u64(START + store.writes());
        let mut loader = RuntimeLoader::new(&mut rng, now, config, registry);
        let runtime = loop {
            match loader.step(now) {
                LoaderState::NeedIo(tasks) => {
                    for task in tasks {
                        let payload = match task.action {
                            RecoveryTask::LoadSnapshot => {
                                RecoveryResult::Snapshot(store.load_snapshot())
                            }
                            RecoveryTask::LoadLog => RecoveryResult::Log(store.load_log()),
                        };
                        loader.provide_io_result(
                            now,
                            IoResult {
                                task_id: task.task_id,
                                payload,
                            },
                        );
                    }
                }
                LoaderState::Loaded(runtime) => break runtime,
                LoaderState::Failed(e) => return Err(e),
            }
        };
        let mut harness = Self {
            runtime,
            store,
            now,
            inbox: VecDeque::new(),
            tasks: VecDeque::new(),
            completed: HashMap::new(),
            outbound: Vec::new(),
            turn_faults: Vec::new(),
            durability_failures: Vec::new(),
            fail_log_writes: 0,
            fail_snapshot_writes: 0,
            effects_written: 0,
            stopped: false,
        };
        harness.inbox.push_back(RuntimeEvent::tick());
        Ok(harness)
    }

    /// Handle one queued event or perform one IO task. Returns false if
    /// there was nothing to do.
    pub fn step(&mut self) -> bool {
        if let Some(event) = self.inbox.pop_front() {
            let results = self.runtime.handle_event(self.now, event);
            self.tasks.extend(results.new_tasks);
            self.completed.extend(results.completed_commands);
            self.outbound.extend(results.outbound);
            self.turn_faults.extend(results.turn_faults);
            self.durability_failures.extend(results.durability_failures);
            self.stopped |= results.stopped;
            return true;
        }
        if let Some(task) = self.tasks.pop_front() {
            let payload = self.perform(task.action);
            self.inbox.push_back(RuntimeEvent::io_complete(IoResult {
                task_id: task.task_id,
                payload,
            }));
            return true;
        }
        false
    }

    fn perform(&mut self, action: CheckpointIoTask) -> CheckpointIoResult {
        match action {
            CheckpointIoTask::LogEffect { effect } => {
                if self.fail_log_writes > 0 {
                    self.fail_log_writes -= 1;
                    return CheckpointIoResult::LogEffect(Err(DurabilityError::new("disk full")));
                }
                let result = self.store.log_effect(&effect);
                if result.is_ok() {
                    self.effects_written += 1;
                }
                CheckpointIoResult::LogEffect(result)
            }
            CheckpointIoTask::LogSnapshot { snapshot } => {
                if self.fail_snapshot_writes > 0 {
                    self.fail_snapshot_writes -= 1;
                    return CheckpointIoResult::LogSnapshot(Err(DurabilityError::new(
                        "snapshot store unavailable",
                    )));
                }
                CheckpointIoResult::LogSnapshot(self.store.log_snapshot(&snapshot))
            }
        }
    }

    pub fn run_until_quiescent(&mut self) {
        while self.step() {}
    }

    /// Run until `turns` more turns have been committed, or nothing is left
    /// to do.
    ///
    /// The runtime dispatches the next turn as soon as the previous one is
    /// committed, so on return that turn may be in flight with its log
    /// write not yet performed.
    pub fn run_turns(&mut self, turns: u64) {
        let target = self.runtime.turns_dispatched() + turns;
        loop {
            let dispatched = self.runtime.turns_dispatched();
            let done = dispatched > target
                || (dispatched == target && self.runtime.phase() == TurnPhase::Idle);
            if done || !self.step() {
                break;
            }
        }
    }

    /// Submit a command and run until it completes.
    ///
    /// # Panics
    ///
    /// If the runtime goes quiet without completing the command.
    pub fn dispatch(&mut self, command: DispatchedCommand) -> CommandResult {
        let DispatchedCommand { command_id, event } = command;
        self.inbox.push_back(event);
        while !self.completed.contains_key(&command_id) {
            if !self.step() {
                panic!("runtime went quiet before command {command_id} completed");
            }
        }
        self.completed.remove(&command_id).unwrap()
    }

    /// Submit a command without waiting for it.
    pub fn submit(&mut self, command: DispatchedCommand) -> CommandId {
        self.inbox.push_back(command.event);
        command.command_id
    }

    pub fn take_result(&mut self, command_id: CommandId) -> Option<CommandResult> {
        self.completed.remove(&command_id)
    }

    pub fn create_actor<V: Into<Value>>(&mut self, behavior: Behavior, state: V) -> Token {
        match self.dispatch(RuntimeEvent::create_actor(behavior, state)) {
            CommandResult::ActorCreated { token } => token,
            other => panic!("unexpected result creating actor: {other:?}"),
        }
    }

    pub fn create_actor_with_token<V: Into<Value>>(
        &mut self,
        token: Token,
        behavior: Behavior,
        state: V,
    ) -> Token {
        match self.dispatch(RuntimeEvent::create_actor_with_token(token, behavior, state)) {
            CommandResult::ActorCreated { token } => token,
            other => panic!("unexpected result creating actor: {other:?}"),
        }
    }

    /// Send a message and run until the runtime is quiet.
    pub fn send<V: Into<Value>>(&mut self, token: &Token, message: V) {
        let command_id = self.submit(RuntimeEvent::send(token.clone(), message));
        self.run_until_quiescent();
        if let Some(result) = self.take_result(command_id) {
            assert_eq!(result, CommandResult::Sent);
        }
    }

    pub fn take_snapshot(&mut self) -> CommandResult {
        self.dispatch(RuntimeEvent::take_snapshot())
    }

    pub fn resume(&mut self) {
        self.inbox.push_back(RuntimeEvent::resume());
        self.run_until_quiescent();
    }

    pub fn stop(&mut self) {
        self.inbox.push_back(RuntimeEvent::stop());
        self.run_until_quiescent();
    }

    pub fn fail_next_log_writes(&mut self, count: usize) {
        self.fail_log_writes = count;
    }

    pub fn fail_next_snapshot_writes(&mut self, count: usize) {
        self.fail_snapshot_writes = count;
    }

    pub fn advance_clock(&mut self, millis: u64) {
        self.now = UnixTimestamp::from_millis(self.now.as_millis() + millis);
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn actor(&self, token: &Token) -> Option<Memento> {
        self.runtime.actor(token)
    }

    /// The state of a live actor.
    ///
    /// # Panics
    ///
    /// If there is no such actor.
    pub fn state_of(&self, token: &Token) -> Value {
        match self.runtime.actor(token) {
            Some(memento) => memento.state,
            None => panic!("no live actor {token}"),
        }
    }

    pub fn pending_events(&self) -> Vec<Event> {
        self.runtime.pending_events()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.runtime.build_snapshot()
    }

    pub fn phase(&self) -> TurnPhase {
        self.runtime.phase()
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut MemoryStore {
        &mut self.store
    }

    pub fn effects_written(&self) -> usize {
        self.effects_written
    }

    pub fn outbound(&self) -> &[Output] {
        &self.outbound
    }

    pub fn take_outbound(&mut self) -> Vec<Output> {
        std::mem::take(&mut self.outbound)
    }

    pub fn turn_faults(&self) -> &[TurnFault] {
        &self.turn_faults
    }

    pub fn durability_failures(&self) -> &[CheckpointError] {
        &self.durability_failures
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Default for RuntimeHarness {
    fn default() -> Self {
        Self::new()
    }
}
