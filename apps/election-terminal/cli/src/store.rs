//! Key/value persistence for state that outlives a single run.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub(crate) enum StoreError {
    #[error("failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("state file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to replace state file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub(crate) type Result<T, E = StoreError> = std::result::Result<T, E>;

/// A flat map of JSON values. Each write replaces one key atomically.
pub(crate) trait Store: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

pub(crate) type SharedStore = Arc<dyn Store>;

/// Typed access on top of [`Store`].
pub(crate) trait StoreExt {
    /// Reads `key` as a `T`. A value of the wrong shape reads as absent.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>;
    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()>;
}

impl<S: Store + ?Sized> StoreExt for S {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                tracing::warn!("ignoring unreadable {key}: {error}");
                Ok(None)
            }
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Serialize {
            key: key.to_owned(),
            source,
        })?;
        self.set(key, value)
    }
}

type Entries = BTreeMap<String, Value>;

fn lock(entries: &Mutex<Entries>) -> MutexGuard<'_, Entries> {
    entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// A [`Store`] backed by a single JSON object on disk.
///
/// The whole file is rewritten on every change: written to a temporary file
/// in the same directory, then renamed over the original, so a crash leaves
/// either the old or the new contents and never a torn file.
#[derive(Debug)]
pub(crate) struct FileStore {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub(crate) fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Entries::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => Entries::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        tracing::debug!("opened state file {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, entries: &Entries) -> Result<()> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let contents = serde_json::to_vec_pretty(entries).map_err(|source| StoreError::Serialize {
            key: "state".to_owned(),
            source,
        })?;

        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
        file.write_all(&contents).map_err(io_error)?;
        file.as_file().sync_all().map_err(io_error)?;
        file.persist(&self.path)?;
        Ok(())
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = lock(&self.entries);
        let mut updated = entries.clone();
        updated.insert(key.to_owned(), value);
        self.write(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut updated = entries.clone();
        updated.remove(key);
        self.write(&updated)?;
        *entries = updated;
        Ok(())
    }
}

/// A [`Store`] that forgets everything when dropped.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    entries: Mutex<Entries>,
}

#[cfg(test)]
impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        lock(&self.entries).insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}
