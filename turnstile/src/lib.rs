//! An async host for the `turnstile-core` checkpointing actor runtime.
//!
//! [`Turnstile`] drives a [`turnstile_core::Runtime`] on an executor,
//! performs the log and snapshot writes it asks for against a [`Storage`]
//! and hands committed outputs to a [`Transport`].
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use turnstile::{Behavior, Turnstile, Value};
//!
//! let turnstile = Turnstile::build_tokio()
//!     .with_behavior("counter", |turn, _msg| {
//!         let n = turn.state().int_field("n")?;
//!         turn.state_mut().set("n", n + 1);
//!         Ok(())
//!     })
//!     .load()
//!     .await?;
//! let counter = turnstile
//!     .create_actor(Behavior::new("counter"), [("n", 0)].into_iter().collect::<Value>())
//!     .await?;
//! turnstile.send(counter, Value::Null).await?;
//! turnstile.stop().await;
//! # Ok(())
//! # }
//! ```
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures::{
    StreamExt,
    channel::{mpsc, oneshot},
    stream::FuturesUnordered,
};
use rand::SeedableRng;
use turnstile_core::{
    CommandId, CommandResult, LoaderState, Runtime, RuntimeEvent, RuntimeResults, UnixTimestamp,
    io::{CheckpointIoTask, IoResult, IoTask},
    runtime::{DispatchedCommand, TurnFault, TurnPhase},
};
pub use turnstile_core::{
    Behavior, BehaviorError, BehaviorRegistry, CheckpointError, DurabilityPolicy, Effect, Memento,
    Output, RuntimeConfig, Snapshot, Token, Turn, Value,
};

mod builder;
pub use builder::TurnstileBuilder;
mod error;
pub use error::{CommandError, LoadError};
mod io_loop;
pub mod runtime;
mod stopped;
pub use stopped::Stopped;
pub mod storage;
pub mod transport;

use crate::{
    storage::{InMemoryStorage, Storage},
    transport::{DiscardTransport, Transport},
};

#[derive(Clone)]
pub struct Turnstile {
    inner: Arc<Mutex<Inner>>,
}

impl Turnstile {
    // Create a new [`Turnstile`] which spawns its tasks onto the provided runtime
    pub fn builder<R: runtime::RuntimeHandle>(
        runtime: R,
    ) -> TurnstileBuilder<InMemoryStorage, R, DiscardTransport> {
        TurnstileBuilder::new(runtime)
    }

    // Create a new [`Turnstile`] which spawns its tasks onto the current tokio runtime
    #[cfg(feature = "tokio")]
    pub fn build_tokio()
    -> TurnstileBuilder<InMemoryStorage, ::tokio::runtime::Handle, DiscardTransport> {
        TurnstileBuilder::new(::tokio::runtime::Handle::current())
    }

    /// Recover the runtime from storage and start it.
    ///
    /// Anything still queued when the previous runtime stopped is dispatched
    /// straight away.
    pub async fn load<R: runtime::RuntimeHandle, S: Storage, T: Transport>(
        builder: TurnstileBuilder<S, R, T>,
    ) -> Result<Self, LoadError> {
        let TurnstileBuilder {
            storage,
            runtime,
            transport,
            config,
            registry,
        } = builder;
        let domain = config.domain.clone();
        let mut rng = rand::rngs::StdRng::from_rng(&mut rand::rng());
        let mut loader = Runtime::load(&mut rng, UnixTimestamp::now(), config, registry);
        let mut running_tasks = FuturesUnordered::new();
        let core = loop {
            match loader.step(UnixTimestamp::now()) {
                LoaderState::NeedIo(tasks) => {
                    for IoTask { task_id, action } in tasks {
                        let storage = storage.clone();
                        running_tasks.push(async move {
                            let result = io_loop::dispatch_recovery_task(storage, action).await;
                            (task_id, result)
                        })
                    }
                }
                LoaderState::Loaded(core) => break core,
                LoaderState::Failed(e) => {
                    tracing::error!(%domain, err=%e, "failed to recover runtime");
                    return Err(LoadError(e));
                }
            }
            let (task_id, payload) = running_tasks.select_next_some().await;
            loader.provide_io_result(UnixTimestamp::now(), IoResult { task_id, payload });
        };

        let (tx_io, rx_io) = mpsc::unbounded();
        let inner = Arc::new(Mutex::new(Inner {
            runtime: *core,
            pending_commands: HashMap::new(),
            tx_io: Some(tx_io),
            transport: Box::new(transport),
            turn_faults: Vec::new(),
            durability_failures: Vec::new(),
            stop_waiters: Vec::new(),
            stopped: false,
        }));

        // Spawned so that IO completes regardless of whether anyone is awaiting
        runtime.spawn(io_loop::io_loop(
            domain.clone(),
            inner.clone(),
            storage,
            rx_io,
        ));

        inner.lock().unwrap().handle_event(RuntimeEvent::tick());
        tracing::info!(%domain, "runtime started");
        Ok(Self { inner })
    }

    /// Create an actor with a freshly generated token.
    ///
    /// Resolves once the creation has been logged and applied.
    pub fn create_actor<V: Into<Value>>(
        &self,
        behavior: Behavior,
        state: V,
    ) -> impl Future<Output = Result<Token, CommandError>> + 'static {
        let result = self.dispatch(RuntimeEvent::create_actor(behavior, state));
        async move {
            match result.await? {
                CommandResult::ActorCreated { token } => Ok(token),
                other => Err(command_error(other)),
            }
        }
    }

    /// Create an actor under a token chosen by the caller, which must be in
    /// the local domain and not already in use.
    pub fn create_actor_with_token<V: Into<Value>>(
        &self,
        token: Token,
        behavior: Behavior,
        state: V,
    ) -> impl Future<Output = Result<Token, CommandError>> + 'static {
        let result = self.dispatch(RuntimeEvent::create_actor_with_token(token, behavior, state));
        async move {
            match result.await? {
                CommandResult::ActorCreated { token } => Ok(token),
                other => Err(command_error(other)),
            }
        }
    }

    /// Send a message from outside any actor.
    ///
    /// Resolves once the message is durably queued, not once it has been
    /// processed. Messages to other domains go straight to the transport.
    pub fn send<V: Into<Value>>(
        &self,
        token: Token,
        message: V,
    ) -> impl Future<Output = Result<(), CommandError>> + 'static {
        let result = self.dispatch(RuntimeEvent::send(token, message));
        async move { sent(result.await?) }
    }

    /// Accept a message from another domain in its wire form.
    pub fn receive<S: Into<String>>(
        &self,
        address: Token,
        content: S,
    ) -> impl Future<Output = Result<(), CommandError>> + 'static {
        let result = self.dispatch(RuntimeEvent::receive(address, content));
        async move { sent(result.await?) }
    }

    /// Write a snapshot and return it. Once this resolves the log written
    /// before it is no longer needed for recovery.
    pub fn snapshot(&self) -> impl Future<Output = Result<Snapshot, CommandError>> + 'static {
        let result = self.dispatch(RuntimeEvent::take_snapshot());
        async move {
            match result.await? {
                CommandResult::SnapshotTaken { snapshot } => Ok(snapshot),
                other => Err(command_error(other)),
            }
        }
    }

    pub fn actor(&self, token: &Token) -> Option<Memento> {
        self.inner.lock().unwrap().runtime.actor(token)
    }

    pub fn domain(&self) -> String {
        self.inner.lock().unwrap().runtime.domain()
    }

    pub fn phase(&self) -> TurnPhase {
        self.inner.lock().unwrap().runtime.phase()
    }

    /// Turns which ended in an exception since the last call.
    pub fn take_turn_faults(&self) -> Vec<TurnFault> {
        std::mem::take(&mut self.inner.lock().unwrap().turn_faults)
    }

    /// Writes the storage refused since the last call. With
    /// [`DurabilityPolicy::Halt`] the runtime dispatches nothing further
    /// until [`Turnstile::resume`] is called.
    pub fn take_durability_failures(&self) -> Vec<CheckpointError> {
        std::mem::take(&mut self.inner.lock().unwrap().durability_failures)
    }

    /// Retry the write that halted the runtime.
    pub fn resume(&self) {
        self.inner
            .lock()
            .unwrap()
            .handle_event(RuntimeEvent::resume());
    }

    // Stop the runtime.
    //
    // Commands which have not completed fail with `Stopped`.
    pub fn stop(&self) -> impl Future<Output = ()> + 'static {
        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.stopped {
                let _ = tx.send(());
            } else {
                inner.stop_waiters.push(tx);
                inner.handle_event(RuntimeEvent::stop());
            }
        }
        async move {
            if rx.await.is_err() {
                tracing::warn!("stop signal was dropped");
            }
        }
    }

    fn dispatch(
        &self,
        command: DispatchedCommand,
    ) -> impl Future<Output = Result<CommandResult, Stopped>> + 'static {
        let DispatchedCommand { command_id, event } = command;
        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self.inner.lock().unwrap();
            if !inner.stopped {
                inner.pending_commands.insert(command_id, tx);
                inner.handle_event(event);
            }
        }
        async move { rx.await.map_err(|_| Stopped) }
    }
}

fn sent(result: CommandResult) -> Result<(), CommandError> {
    match result {
        CommandResult::Sent => Ok(()),
        other => Err(command_error(other)),
    }
}

fn command_error(result: CommandResult) -> CommandError {
    match result {
        CommandResult::Rejected { reason } => CommandError::Rejected(reason),
        CommandResult::Failed { error } => CommandError::Failed(error),
        other => panic!("unexpected command result: {other:?}"),
    }
}

struct Inner {
    runtime: Runtime,
    pending_commands: HashMap<CommandId, oneshot::Sender<CommandResult>>,
    tx_io: Option<mpsc::UnboundedSender<IoTask<CheckpointIoTask>>>,
    transport: Box<dyn Transport>,
    turn_faults: Vec<TurnFault>,
    durability_failures: Vec<CheckpointError>,
    stop_waiters: Vec<oneshot::Sender<()>>,
    stopped: bool,
}

impl Inner {
    #[tracing::instrument(skip(self, event), fields(domain=%self.runtime.domain()))]
    fn handle_event(&mut self, event: RuntimeEvent) {
        let RuntimeResults {
            new_tasks,
            completed_commands,
            outbound,
            turn_faults,
            durability_failures,
            stopped,
        } = self.runtime.handle_event(UnixTimestamp::now(), event);

        for (command_id, result) in completed_commands {
            if let Some(tx) = self.pending_commands.remove(&command_id) {
                let _ = tx.send(result);
            } else {
                tracing::warn!(%command_id, "received result for unknown command");
            }
        }

        for task in new_tasks {
            let Some(tx_io) = &self.tx_io else {
                tracing::warn!(task_id=%task.task_id, "dropping io task, io loop has exited");
                continue;
            };
            if tx_io.unbounded_send(task).is_err() {
                tracing::warn!("io loop receiver dropped");
            }
        }

        for output in outbound {
            self.transport.deliver(output);
        }

        self.turn_faults.extend(turn_faults);
        for failure in &durability_failures {
            tracing::error!(err=%failure, "durability failure");
        }
        self.durability_failures.extend(durability_failures);

        if stopped && !self.stopped {
            self.stopped = true;
            self.tx_io = None;
            // dropping the senders fails the waiting commands with `Stopped`
            self.pending_commands.clear();
            for waiter in self.stop_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }
}
