use std::sync::{Arc, Mutex};

use futures::StreamExt;

use super::{
    CommandResult, RunState, Runtime,
    checkpoint::{self, Checkpointed},
    driver::{Clock, ProcessContext},
    io_access::IoAccess,
    state::{State, Step},
};

mod runtime_input;
pub(crate) use runtime_input::RuntimeInput;
mod runtime_output;
pub(crate) use runtime_output::RuntimeOutput;

enum Control {
    Continue,
    Stop,
}

/// The turn loop.
///
/// Host input is only looked at between steps, so it can never interleave
/// with a turn. Each step either commits one effect, writes one snapshot or
/// waits for input.
pub(crate) async fn run(cx: ProcessContext<Runtime>, state: Arc<Mutex<State>>) {
    let ProcessContext {
        clock,
        io,
        inputs: mut rx_input,
    } = cx;
    let io = IoAccess::new(io);

    'outer: loop {
        loop {
            match rx_input.try_next() {
                Ok(Some(input)) => {
                    if let Control::Stop = handle_input(&clock, &state, &io, input) {
                        break 'outer;
                    }
                }
                Ok(None) => break 'outer,
                Err(_) => break,
            }
        }

        let step = {
            let mut state = state.lock().unwrap();
            state.set_now(clock.now());
            state.next_step()
        };
        match step {
            Step::Commit(pending) => match checkpoint::save_checkpoint(&io, &state, pending).await {
                Checkpointed::Committed | Checkpointed::Halted => {}
                Checkpointed::Aborted => break 'outer,
            },
            Step::Snapshot { snapshot, waiters } => {
                let result = io.log_snapshot(snapshot.clone()).await;
                state
                    .lock()
                    .unwrap()
                    .snapshot_logged(&io, snapshot, waiters, result);
            }
            Step::Idle => match rx_input.next().await {
                Some(input) => {
                    if let Control::Stop = handle_input(&clock, &state, &io, input) {
                        break 'outer;
                    }
                }
                None => break 'outer,
            },
        }
    }

    tracing::info!("stopping runtime");
    let mut state = state.lock().unwrap();
    for (command_id, result) in state.reject_waiting("runtime stopped") {
        io.emit(RuntimeOutput::CommandCompleted { command_id, result });
    }
    // commands which arrived after the last look at the input
    while let Ok(Some(input)) = rx_input.try_next() {
        if let RuntimeInput::Command { command_id, .. } = input {
            io.emit(RuntimeOutput::CommandCompleted {
                command_id,
                result: CommandResult::Rejected {
                    reason: "runtime stopped".to_string(),
                },
            });
        }
    }
    state.set_run_state(RunState::Stopped);
}

fn handle_input(
    clock: &Clock,
    state: &Arc<Mutex<State>>,
    io: &IoAccess,
    input: RuntimeInput,
) -> Control {
    let mut state = state.lock().unwrap();
    state.set_now(clock.now());
    match input {
        RuntimeInput::Stop => return Control::Stop,
        RuntimeInput::Tick => {}
        RuntimeInput::Resume => state.resume(),
        RuntimeInput::Command {
            command_id,
            command,
        } => {
            tracing::trace!(%command_id, ?command, "handling command");
            if let Some(result) = state.handle_command(command_id, *command) {
                io.emit(RuntimeOutput::CommandCompleted { command_id, result });
            }
        }
    }
    Control::Continue
}
