use turnstile_core::{DurabilityError, Effect, Snapshot};

/// A log and snapshot store held in memory, in the same JSON form a real
/// store would write.
///
/// Cloning a store and recovering a new runtime from the clone simulates a
/// crash and restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Option<String>,
    log: Vec<String>,
    snapshots_written: usize,
    writes: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_effect(&mut self, effect: &Effect) -> Result<(), DurabilityError> {
        let line = effect
            .to_json()
            .map_err(|e| DurabilityError::new(format!("unencodable effect: {e}")))?;
        self.log.push(line);
        self.writes += 1;
        Ok(())
    }

    /// Store a snapshot and drop the log it supersedes.
    pub fn log_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), DurabilityError> {
        let json = snapshot
            .to_json()
            .map_err(|e| DurabilityError::new(format!("unencodable snapshot: {e}")))?;
        self.snapshot = Some(json);
        self.log.clear();
        self.snapshots_written += 1;
        self.writes += 1;
        Ok(())
    }

    pub fn load_snapshot(&self) -> Result<Option<Snapshot>, DurabilityError> {
        self.snapshot
            .as_deref()
            .map(Snapshot::from_json)
            .transpose()
            .map_err(|e| DurabilityError::new(format!("corrupt snapshot: {e}")))
    }

    pub fn load_log(&self) -> Result<Vec<Effect>, DurabilityError> {
        self.log
            .iter()
            .map(|line| Effect::from_json(line))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DurabilityError::new(format!("corrupt log entry: {e}")))
    }

    /// The raw log lines, oldest first.
    pub fn log_lines(&self) -> &[String] {
        &self.log
    }

    pub fn snapshot_json(&self) -> Option<&str> {
        self.snapshot.as_deref()
    }

    pub fn snapshots_written(&self) -> usize {
        self.snapshots_written
    }

    /// Successful writes of any kind.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Keep only the first `len` log entries, as if the rest were lost.
    pub fn truncate_log(&mut self, len: usize) {
        self.log.truncate(len);
    }

    /// Overwrite a log entry, for integrity tests.
    pub fn replace_log_entry(&mut self, index: usize, effect: &Effect) {
        self.log[index] = effect.to_json().expect("replacement effect encodes");
    }

    pub fn push_raw_log_line<S: Into<String>>(&mut self, line: S) {
        self.log.push(line.into());
    }
}
