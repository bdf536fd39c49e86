use crate::{
    BehaviorRegistry, CheckpointError, RuntimeConfig, UnixTimestamp,
    io::{IoResult, IoTask, RecoveryResult, RecoveryTask},
    runtime::{
        Runtime,
        driver::{Driver, Stepped},
        loading::{self, Loading},
        state::State,
    },
};

/// A state machine for recovering a runtime from storage.
///
/// ## Usage
///
/// ```rust,no_run
/// use turnstile_core::{
///     BehaviorRegistry, LoaderState, RuntimeConfig, RuntimeLoader, UnixTimestamp,
///     io::{IoResult, RecoveryResult},
/// };
///
/// let mut loader = RuntimeLoader::new(
///     &mut rand::rng(),
///     UnixTimestamp::now(),
///     RuntimeConfig::default(),
///     BehaviorRegistry::new(),
/// );
///
/// loop {
///     match loader.step(UnixTimestamp::now()) {
///         LoaderState::NeedIo(tasks) => {
///             for task in tasks {
///                 // ... execute task ...
///                 # let result: IoResult<RecoveryResult> = todo!();
///                 loader.provide_io_result(UnixTimestamp::now(), result);
///             }
///         }
///         LoaderState::Loaded(runtime) => break,
///         LoaderState::Failed(error) => panic!("{error}"),
///     }
/// }
/// ```
pub struct RuntimeLoader {
    driver: Driver<Loading>,
}

/// The current state of the loader.
pub enum LoaderState {
    /// The loader needs IO operations to be performed.
    ///
    /// The caller should execute all provided IO tasks and call
    /// `provide_io_result` for each completed task, then call `step` again.
    NeedIo(Vec<IoTask<RecoveryTask>>),

    /// Recovery is complete. Send the runtime a
    /// [`RuntimeEvent::tick`](crate::runtime::RuntimeEvent::tick) to start
    /// dispatching any events which were pending.
    Loaded(Box<Runtime>),

    /// Storage could not be read, or the log does not follow from the
    /// snapshot.
    Failed(CheckpointError),
}

impl RuntimeLoader {
    pub fn new<R: rand::RngCore>(
        rng: &mut R,
        now: UnixTimestamp,
        config: RuntimeConfig,
        registry: BehaviorRegistry,
    ) -> Self {
        let state = State::new(rng, now, config, registry);
        let driver = Driver::start(now, |cx| loading::load(state, cx));
        Self { driver }
    }

    /// Advances the loader state machine.
    ///
    /// This method should be called repeatedly until `LoaderState::Loaded`
    /// or `LoaderState::Failed` is returned.
    #[tracing::instrument(skip(self), level = "trace")]
    pub fn step(&mut self, now: UnixTimestamp) -> LoaderState {
        match self.driver.step(now) {
            Stepped::Suspended(tasks) => LoaderState::NeedIo(tasks),
            Stepped::Finished(tasks, recovered) => {
                assert!(tasks.is_empty());
                match recovered {
                    Ok(state) => LoaderState::Loaded(Box::new(Runtime::from_state(now, state))),
                    Err(error) => LoaderState::Failed(error),
                }
            }
        }
    }

    /// Provides the result of an IO operation.
    pub fn provide_io_result(&mut self, now: UnixTimestamp, result: IoResult<RecoveryResult>) {
        self.driver.complete_task(now, result);
    }
}
