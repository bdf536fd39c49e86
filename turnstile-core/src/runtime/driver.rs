use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex},
};

use futures::channel::{mpsc, oneshot};

use crate::{
    UnixTimestamp,
    io::{IoResult, IoTask, IoTaskId},
};

use super::executor::LocalExecutor;

/// A long running computation written as a future which reaches the outside
/// world only by requesting IO tasks and emitting items. Each call to
/// [`Driver::step`] gathers both into `Results`.
pub(crate) trait Process {
    type Task: Debug;
    type TaskResult: Debug + 'static;
    type Emitted: Debug;
    type Input: Debug;
    type Finished;
    type Results;

    fn collect(emitted: Vec<Self::Emitted>, tasks: Vec<IoTask<Self::Task>>) -> Self::Results;
}

/// The time as of the current step, shared with the running future.
#[derive(Clone)]
pub(crate) struct Clock(Arc<Mutex<UnixTimestamp>>);

impl Clock {
    fn new(now: UnixTimestamp) -> Self {
        Self(Arc::new(Mutex::new(now)))
    }

    fn set(&self, now: UnixTimestamp) {
        *self.0.lock().unwrap() = now;
    }

    pub(crate) fn now(&self) -> UnixTimestamp {
        *self.0.lock().unwrap()
    }
}

/// What the future is handed when it is started.
pub(crate) struct ProcessContext<P: Process> {
    pub(crate) clock: Clock,
    pub(crate) io: ProcessIo<P>,
    pub(crate) inputs: mpsc::UnboundedReceiver<P::Input>,
}

enum Request<P: Process> {
    Task {
        action: P::Task,
        reply: oneshot::Sender<P::TaskResult>,
    },
    Emit(P::Emitted),
}

pub(crate) enum Stepped<P: Process> {
    Suspended(P::Results),
    Finished(P::Results, P::Finished),
}

/// Owns a [`Process`] future and steps it on the caller's thread.
pub(crate) struct Driver<P: Process> {
    clock: Clock,
    awaiting: HashMap<IoTaskId, oneshot::Sender<P::TaskResult>>,
    requests: mpsc::UnboundedReceiver<Request<P>>,
    inputs: mpsc::UnboundedSender<P::Input>,
    executor: LocalExecutor<P::Finished>,
}

impl<P: Process> Driver<P> {
    pub(crate) fn start<S, F>(now: UnixTimestamp, start: S) -> Self
    where
        S: FnOnce(ProcessContext<P>) -> F,
        F: Future<Output = P::Finished> + Send + 'static,
    {
        let clock = Clock::new(now);
        let (tx_requests, requests) = mpsc::unbounded();
        let (inputs, rx_inputs) = mpsc::unbounded();
        let future = start(ProcessContext {
            clock: clock.clone(),
            io: ProcessIo { tx_requests },
            inputs: rx_inputs,
        });
        Self {
            clock,
            awaiting: HashMap::new(),
            requests,
            inputs,
            executor: LocalExecutor::spawn(future),
        }
    }

    pub(crate) fn push_input(&mut self, now: UnixTimestamp, input: P::Input) {
        self.clock.set(now);
        if self.inputs.unbounded_send(input).is_err() {
            tracing::debug!("input sent to a finished process");
        }
    }

    pub(crate) fn complete_task(&mut self, now: UnixTimestamp, result: IoResult<P::TaskResult>) {
        self.clock.set(now);
        match self.awaiting.remove(&result.task_id) {
            Some(reply) => {
                let _ = reply.send(result.payload);
            }
            None => tracing::warn!(task_id=%result.task_id, "result for a task nobody is waiting on"),
        }
    }

    /// Run the future until it can make no more progress, then return what
    /// it asked for along the way.
    pub(crate) fn step(&mut self, now: UnixTimestamp) -> Stepped<P> {
        self.clock.set(now);
        let finished = self.executor.run_until_stalled();

        let mut emitted = Vec::new();
        let mut tasks = Vec::new();
        while let Ok(Some(request)) = self.requests.try_next() {
            match request {
                Request::Task { action, reply } => {
                    let task_id = IoTaskId::new();
                    tracing::trace!(%task_id, ?action, "io task requested");
                    self.awaiting.insert(task_id, reply);
                    tasks.push(IoTask { task_id, action });
                }
                Request::Emit(item) => emitted.push(item),
            }
        }

        let results = P::collect(emitted, tasks);
        match finished {
            Some(finished) => Stepped::Finished(results, finished),
            None => Stepped::Suspended(results),
        }
    }
}

/// The future's side of the driver.
pub(crate) struct ProcessIo<P: Process> {
    tx_requests: mpsc::UnboundedSender<Request<P>>,
}

impl<P: Process> Clone for ProcessIo<P> {
    fn clone(&self) -> Self {
        Self {
            tx_requests: self.tx_requests.clone(),
        }
    }
}

impl<P: Process> ProcessIo<P> {
    /// Ask the caller to perform `action` and wait for its result.
    ///
    /// # Panics
    ///
    /// If the driver is dropped while the task is outstanding.
    pub(crate) fn request(&self, action: P::Task) -> impl Future<Output = P::TaskResult> + 'static {
        let (reply, rx) = oneshot::channel();
        let _ = self
            .tx_requests
            .unbounded_send(Request::Task { action, reply });
        async move { rx.await.expect("driver dropped with an io task outstanding") }
    }

    pub(crate) fn emit(&self, item: P::Emitted) {
        let _ = self.tx_requests.unbounded_send(Request::Emit(item));
    }
}
