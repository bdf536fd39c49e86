use crate::{EventId, Token, runtime::TurnPhase};

/// Errors raised by the checkpoint protocol.
///
/// `DispatchReentry`, `NoActiveEffect` and `EffectAlreadyActive` indicate a
/// defect in the runtime itself. `ReplayIntegrity` is fatal to recovery.
/// `DurabilityWrite` and `DurabilityRead` are operational failures which are
/// reported to the host.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckpointError {
    #[error("no effect is active")]
    NoActiveEffect,
    #[error("an effect is already active")]
    EffectAlreadyActive,
    #[error("cannot begin a turn while another is in phase {in_flight:?}")]
    DispatchReentry { in_flight: TurnPhase },
    #[error("no live actor for {0}")]
    UnknownActor(Token),
    #[error("no behavior registered as {0:?}")]
    UnknownBehavior(String),
    #[error("actor {0} already exists")]
    DuplicateActor(Token),
    #[error("{token} is not in local domain {domain:?}")]
    ForeignToken { token: Token, domain: String },
    #[error("{0} contains a non-finite float, which cannot be logged")]
    Unencodable(String),
    #[error("log entry caused by {found:?} does not match queue head {expected:?}")]
    ReplayIntegrity {
        expected: Option<EventId>,
        found: Option<EventId>,
    },
    #[error("durable write failed: {0}")]
    DurabilityWrite(DurabilityError),
    #[error("durable read failed: {0}")]
    DurabilityRead(DurabilityError),
}

/// A failure reported by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DurabilityError(pub String);

impl DurabilityError {
    pub fn new<S: Into<String>>(msg: S) -> Self {
        Self(msg.into())
    }
}
