use std::collections::BTreeMap;

use crate::{Event, Memento, Token};

mod accumulator;
pub use accumulator::EffectAccumulator;
mod output;
pub use output::Output;
mod turn_exception;
pub use turn_exception::{ExceptionKind, TurnException};

/// Everything one turn did, or would do once committed.
///
/// An effect is written to the log before any of it becomes visible. The
/// effect of a turn which failed is still logged, for audit, but when it is
/// applied only its cause is consumed: `created`, `sent` and `output` are
/// discarded and the actor keeps its pre-turn memento.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Effect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Event>,
    #[serde(default)]
    pub created: BTreeMap<Token, Memento>,
    #[serde(default)]
    pub sent: Vec<Event>,
    #[serde(default)]
    pub output: Vec<Output>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Memento>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<TurnException>,
}

impl Effect {
    pub(crate) fn caused_by(cause: Option<Event>) -> Self {
        Effect {
            cause,
            ..Default::default()
        }
    }

    /// True when committing this effect would change nothing, in which case
    /// it is not written to the log at all.
    pub fn is_empty(&self) -> bool {
        self.cause.is_none()
            && self.exception.is_none()
            && self.output.is_empty()
            && self.sent.is_empty()
            && self.created.is_empty()
    }

    pub fn is_exception(&self) -> bool {
        self.exception.is_some()
    }

    /// The logged form. Fails only if a value holds a non-finite float,
    /// which the runtime refuses to put into an effect.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
