use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::{Event, Memento, Token};

/// A consolidated image of every live actor and every pending event.
///
/// Restoring a snapshot on its own reconstructs a runtime which is
/// observably identical to the one it was taken from.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub created: BTreeMap<Token, Memento>,
    pub sent: Vec<Event>,
    /// The next sequence number the domain will hand out. Absent in older
    /// snapshots, in which case it is derived from `sent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_seq: Option<u64>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Hex encoded SHA-256 of the canonical JSON form.
    ///
    /// Two snapshots with equal digests are byte for byte identical.
    pub fn digest(&self) -> Result<String, serde_json::Error> {
        Ok(hex::encode(Sha256::digest(self.to_json()?.as_bytes())))
    }

    pub fn len(&self) -> usize {
        self.created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.sent.is_empty()
    }
}
