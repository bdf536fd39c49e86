#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionKind {
    /// The behavior returned an error or panicked.
    Behavior,
    /// The event was addressed to a token with no live actor.
    UnknownActor,
    /// The actor's behavior is not registered.
    UnknownBehavior,
}

/// Why a turn was aborted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TurnException {
    pub kind: ExceptionKind,
    pub message: String,
}

impl TurnException {
    pub fn new<S: Into<String>>(kind: ExceptionKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TurnException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}
