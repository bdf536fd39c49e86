//! The IO requested by the core and the results the caller feeds back.
//!
//! The core performs no IO itself. Every durable write or read shows up as
//! an [`IoTask`] in the results of a step; the caller executes it and hands
//! back an [`IoResult`] carrying the same task ID.
mod checkpoint_io;
pub use checkpoint_io::{CheckpointIoResult, CheckpointIoTask};
mod io_result;
pub use io_result::IoResult;
mod io_task;
pub use io_task::IoTask;
mod io_task_id;
pub use io_task_id::IoTaskId;
mod recovery_io;
pub use recovery_io::{RecoveryResult, RecoveryTask};
