use crate::{Behavior, CheckpointError, Token, Value};

/// The durable form of one actor: its token, state and behavior.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Memento {
    pub token: Token,
    pub state: Value,
    pub behavior: Behavior,
}

impl Memento {
    /// Fails if the state or the behavior's parameters have no logged form.
    pub fn check_encodable(&self) -> Result<(), CheckpointError> {
        if self.state.is_encodable() && self.behavior.params.is_encodable() {
            Ok(())
        } else {
            Err(CheckpointError::Unencodable(format!("state of {}", self.token)))
        }
    }
}
