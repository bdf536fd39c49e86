use crate::{Token, Value};

/// A message for an actor outside the local domain.
///
/// Outputs are handed to the transport only once the effect which produced
/// them has been committed without an exception.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Output {
    pub address: Token,
    pub message: Value,
}

impl Output {
    /// The message in its wire form.
    pub fn content(&self) -> Result<String, crate::MarshalError> {
        crate::marshal::encode(&self.message)
    }
}
