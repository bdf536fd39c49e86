use std::sync::{Arc, Mutex};

use turnstile_core::{Effect, Snapshot};

use crate::storage::{Storage, StorageError};

/// Keeps the log and snapshot in memory, serialized as they would be on
/// disk. Clones share the same contents, so a second runtime loaded from a
/// clone sees everything the first one wrote.
#[derive(Clone)]
pub struct InMemoryStorage(Arc<Mutex<Contents>>);

#[derive(Default)]
struct Contents {
    snapshot: Option<String>,
    log: Vec<String>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Contents::default())))
    }

    /// The number of effects logged since the last snapshot.
    pub fn log_len(&self) -> usize {
        self.0.lock().unwrap().log.len()
    }

    pub fn has_snapshot(&self) -> bool {
        self.0.lock().unwrap().snapshot.is_some()
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for InMemoryStorage {
    fn append_effect(&self, effect: Effect) -> impl Future<Output = Result<(), StorageError>> + Send {
        let result = effect
            .to_json()
            .map(|line| self.0.lock().unwrap().log.push(line))
            .map_err(|source| StorageError::Encode {
                what: "effect",
                source,
            });
        futures::future::ready(result)
    }

    fn write_snapshot(
        &self,
        snapshot: Snapshot,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        let result = match snapshot.to_json() {
            Ok(json) => {
                let mut contents = self.0.lock().unwrap();
                contents.snapshot = Some(json);
                contents.log.clear();
                Ok(())
            }
            Err(source) => Err(StorageError::Encode {
                what: "snapshot",
                source,
            }),
        };
        futures::future::ready(result)
    }

    fn load_snapshot(&self) -> impl Future<Output = Result<Option<Snapshot>, StorageError>> + Send {
        let result = self
            .0
            .lock()
            .unwrap()
            .snapshot
            .as_deref()
            .map(Snapshot::from_json)
            .transpose()
            .map_err(|source| StorageError::Corrupt {
                what: "snapshot",
                source,
            });
        futures::future::ready(result)
    }

    fn load_log(&self) -> impl Future<Output = Result<Vec<Effect>, StorageError>> + Send {
        let result = self
            .0
            .lock()
            .unwrap()
            .log
            .iter()
            .map(|line| Effect::from_json(line))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| StorageError::Corrupt {
                what: "log entry",
                source,
            });
        futures::future::ready(result)
    }
}
