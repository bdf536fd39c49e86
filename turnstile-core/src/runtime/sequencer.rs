use crate::{Event, Token, UnixTimestamp, Value};

/// Stamps events with the local domain, the current time and the next
/// sequence number.
///
/// Sequence numbers are never handed out twice, including those used by
/// turns that were rolled back or never committed.
#[derive(Debug)]
pub(crate) struct Sequencer {
    domain: String,
    next_seq: u64,
    now: UnixTimestamp,
}

impl Sequencer {
    pub(crate) fn new(domain: String, now: UnixTimestamp) -> Self {
        Self {
            domain,
            next_seq: 0,
            now,
        }
    }

    pub(crate) fn domain(&self) -> &str {
        &self.domain
    }

    pub(crate) fn now(&self) -> UnixTimestamp {
        self.now
    }

    pub(crate) fn set_now(&mut self, now: UnixTimestamp) {
        self.now = now;
    }

    pub(crate) fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub(crate) fn stamp(&mut self, token: Token, message: Value) -> Event {
        let seq = self.next_seq;
        self.next_seq += 1;
        Event {
            domain: self.domain.clone(),
            time: self.now,
            seq,
            message,
            token,
        }
    }

    /// Make sure `event`'s sequence number is never handed out again.
    pub(crate) fn observe(&mut self, event: &Event) {
        if event.domain == self.domain && event.seq >= self.next_seq {
            self.next_seq = event.seq + 1;
        }
    }

    pub(crate) fn reset(&mut self, next_seq: u64) {
        self.next_seq = next_seq;
    }
}
