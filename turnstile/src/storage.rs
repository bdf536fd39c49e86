use turnstile_core::{DurabilityError, Effect, Snapshot};

#[cfg(feature = "tokio")]
mod filesystem;
mod in_memory;
pub use in_memory::InMemoryStorage;

#[cfg(feature = "tokio")]
pub use filesystem::FilesystemStorage;

/// Durable storage for the effect log and the latest snapshot.
///
/// A successful `write_snapshot` supersedes every effect appended before it:
/// `load_log` only returns effects appended after the most recent snapshot.
pub trait Storage: Send + Clone + 'static {
    fn append_effect(&self, effect: Effect) -> impl Future<Output = Result<(), StorageError>> + Send;
    fn write_snapshot(
        &self,
        snapshot: Snapshot,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
    fn load_snapshot(&self) -> impl Future<Output = Result<Option<Snapshot>, StorageError>> + Send;
    fn load_log(&self) -> impl Future<Output = Result<Vec<Effect>, StorageError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt {what}: {source}")]
    Corrupt {
        what: &'static str,
        source: serde_json::Error,
    },
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        source: serde_json::Error,
    },
}

impl From<StorageError> for DurabilityError {
    fn from(e: StorageError) -> Self {
        DurabilityError::new(e.to_string())
    }
}
