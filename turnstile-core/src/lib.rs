//! The sans-IO core of turnstile, a checkpointing actor runtime.
//!
//! Actors are addressed by [`Token`] and hold a [`Value`] as state and a
//! named [`Behavior`]. Each message is processed in a turn. Everything the
//! turn does is gathered into an [`Effect`], which is written to a durable
//! log before it is applied, so that after a crash the runtime can be
//! rebuilt from the latest [`Snapshot`] plus the effects logged since.
//!
//! This crate performs no IO. See [`runtime::Runtime`] for how the caller
//! drives it.
mod behavior;
pub use behavior::{Behavior, BehaviorError, BehaviorFn, BehaviorRegistry, IGNORE};
mod config;
pub use config::{DEFAULT_DOMAIN, DurabilityPolicy, RuntimeConfig};
mod effect;
pub use effect::{Effect, EffectAccumulator, ExceptionKind, Output, TurnException};
mod error;
pub use error::{CheckpointError, DurabilityError};
mod event;
pub use event::{Event, EventId};
mod event_queue;
pub use event_queue::EventQueue;
pub mod io;
mod loader;
pub use loader::{LoaderState, RuntimeLoader};
pub mod marshal;
pub use marshal::MarshalError;
mod memento;
pub use memento::Memento;
pub mod runtime;
pub use runtime::{CommandId, CommandResult, Runtime, RuntimeEvent, RuntimeResults, Turn};
mod snapshot;
pub use snapshot::Snapshot;
mod token;
pub use token::{BadToken, Token};
mod unix_timestamp;
pub use unix_timestamp::UnixTimestamp;
mod value;
pub use value::Value;
