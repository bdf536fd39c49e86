use crate::{Token, UnixTimestamp, Value};

/// A message waiting to be delivered to a local actor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Event {
    pub domain: String,
    pub time: UnixTimestamp,
    pub seq: u64,
    pub message: Value,
    pub token: Token,
}

/// Identifies an event when matching logged effects against the queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventId {
    pub domain: String,
    pub time: UnixTimestamp,
    pub seq: u64,
}

impl Event {
    pub fn id(&self) -> EventId {
        EventId {
            domain: self.domain.clone(),
            time: self.time,
            seq: self.seq,
        }
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}#{}", self.domain, self.time, self.seq)
    }
}
