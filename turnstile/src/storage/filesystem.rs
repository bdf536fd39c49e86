use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use tokio::io::AsyncWriteExt;
use turnstile_core::{Effect, Snapshot};

use crate::storage::{Storage, StorageError};

const SNAPSHOT_FILE: &str = "snapshot.json";
const SNAPSHOT_TMP_FILE: &str = "snapshot.json.tmp";

/// Stores the log and snapshot in a directory.
///
/// Effects are appended as JSON lines to `log.<generation>.jsonl` and synced
/// before the write is acknowledged. A snapshot is written to a temporary
/// file and renamed over `snapshot.json`, bumping the generation, so a crash
/// at any point leaves either the old snapshot with its log or the new
/// snapshot with an empty one.
#[derive(Clone)]
pub struct FilesystemStorage {
    dir: PathBuf,
    generation: Arc<Mutex<Option<u64>>>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct SnapshotFile {
    generation: u64,
    snapshot: Snapshot,
}

impl FilesystemStorage {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            generation: Arc::new(Mutex::new(None)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn log_path(&self, generation: u64) -> PathBuf {
        self.dir.join(format!("log.{generation}.jsonl"))
    }

    async fn read_snapshot_file(&self) -> Result<Option<SnapshotFile>, StorageError> {
        match tokio::fs::read(self.dir.join(SNAPSHOT_FILE)).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| StorageError::Corrupt {
                    what: "snapshot",
                    source,
                }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn generation(&self) -> Result<u64, StorageError> {
        let cached = *self.generation.lock().unwrap();
        if let Some(generation) = cached {
            return Ok(generation);
        }
        let generation = self
            .read_snapshot_file()
            .await?
            .map_or(0, |file| file.generation);
        *self.generation.lock().unwrap() = Some(generation);
        Ok(generation)
    }
}

impl Storage for FilesystemStorage {
    fn append_effect(&self, effect: Effect) -> impl Future<Output = Result<(), StorageError>> + Send {
        let this = self.clone();
        async move {
            let mut line = effect.to_json().map_err(|source| StorageError::Encode {
                what: "effect",
                source,
            })?;
            line.push('\n');

            let generation = this.generation().await?;
            tokio::fs::create_dir_all(&this.dir).await?;
            let path = this.log_path(generation);
            let created = !tokio::fs::try_exists(&path).await?;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            let start = file.metadata().await?.len();
            let written = async {
                file.write_all(line.as_bytes()).await?;
                file.sync_data().await
            }
            .await;
            if let Err(e) = written {
                // don't leave a fragment for the retry to append to
                if let Err(truncate) = file.set_len(start).await {
                    tracing::error!(err=%truncate, "failed to remove partial log entry");
                }
                return Err(e.into());
            }
            if created {
                sync_dir(&this.dir).await?;
            }
            Ok(())
        }
    }

    fn write_snapshot(
        &self,
        snapshot: Snapshot,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        let this = self.clone();
        async move {
            let previous = this.generation().await?;
            let generation = previous + 1;
            let contents = serde_json::to_vec(&SnapshotFile {
                generation,
                snapshot,
            })
            .map_err(|source| StorageError::Encode {
                what: "snapshot",
                source,
            })?;

            tokio::fs::create_dir_all(&this.dir).await?;
            let tmp = this.dir.join(SNAPSHOT_TMP_FILE);
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(&contents).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, this.dir.join(SNAPSHOT_FILE)).await?;
            sync_dir(&this.dir).await?;
            *this.generation.lock().unwrap() = Some(generation);

            if let Err(e) = tokio::fs::remove_file(this.log_path(previous)).await {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(err=%e, previous, "failed to remove superseded log");
                }
            }
            Ok(())
        }
    }

    fn load_snapshot(&self) -> impl Future<Output = Result<Option<Snapshot>, StorageError>> + Send {
        let this = self.clone();
        async move {
            let Some(SnapshotFile {
                generation,
                snapshot,
            }) = this.read_snapshot_file().await?
            else {
                *this.generation.lock().unwrap() = Some(0);
                return Ok(None);
            };
            *this.generation.lock().unwrap() = Some(generation);
            Ok(Some(snapshot))
        }
    }

    fn load_log(&self) -> impl Future<Output = Result<Vec<Effect>, StorageError>> + Send {
        let this = self.clone();
        async move {
            let generation = this.generation().await?;
            let path = this.log_path(generation);
            let contents = match tokio::fs::read(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };
            // Entries are acknowledged only once their newline is synced, so
            // anything after the last newline was never acknowledged.
            let end = contents
                .iter()
                .rposition(|b| *b == b'\n')
                .map_or(0, |i| i + 1);
            if end < contents.len() {
                tracing::warn!(
                    generation,
                    bytes = contents.len() - end,
                    "dropping torn final log entry"
                );
                truncate_log(&path, end as u64).await?;
            }
            let mut effects = Vec::new();
            for line in contents[..end].split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
                let effect = serde_json::from_slice::<Effect>(line).map_err(|source| StorageError::Corrupt {
                    what: "log entry",
                    source,
                })?;
                effects.push(effect);
            }
            Ok(effects)
        }
    }
}

/// Cut a torn entry off the end of a log so the next append starts on a
/// fresh line.
async fn truncate_log(path: &Path, len: u64) -> Result<(), StorageError> {
    let file = tokio::fs::OpenOptions::new().write(true).open(path).await?;
    file.set_len(len).await?;
    file.sync_all().await?;
    Ok(())
}

/// Make a rename or a newly created file in `dir` durable.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<(), StorageError> {
    tokio::fs::File::open(dir).await?.sync_all().await?;
    Ok(())
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<(), StorageError> {
    Ok(())
}
