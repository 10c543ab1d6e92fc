//! Persisted key/value storage for session data.
//!
//! The session store needs somewhere durable to keep tokens between runs,
//! the same role browser local storage plays for a web page. Not every
//! execution context has such a place (server-side rendering, sandboxed
//! tests), so the store talks to a [`Storage`] trait and we ship three
//! backends:
//!
//! | Backend            | Durable | Use                                  |
//! |--------------------|---------|--------------------------------------|
//! | [`FileStorage`]    | yes     | desktop/CLI clients                  |
//! | [`MemoryStorage`]  | no      | tests, short-lived processes         |
//! | [`NullStorage`]    | no      | contexts with no storage at all      |

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dojo_protocol::{Codec, JsonCodec};
use parking_lot::Mutex;

use crate::StorageError;

/// A synchronous string key/value store.
///
/// Methods are synchronous on purpose: reading a token must never make a
/// caller wait on I/O scheduling, mirroring browser storage.
pub trait Storage: Send + Sync + 'static {
    /// Returns the value for `key`, or `None` if it was never set.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Sets `key` to `value`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Whether values written here survive a restart.
    fn is_persistent(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Process-local storage backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().remove(key);
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// NullStorage
// ---------------------------------------------------------------------------

/// Storage for contexts that have none: reads are empty, writes vanish.
///
/// A session store over `NullStorage` behaves as a pure in-memory store.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStorage;

impl Storage for NullStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// FileStorage
// ---------------------------------------------------------------------------

/// Durable storage kept as a single JSON object on disk.
///
/// The whole map is loaded on [`open`](Self::open) and rewritten on every
/// change. Writes go to a sibling temp file first and are then renamed
/// over the real one, so a crash mid-write leaves the previous document
/// intact.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Opens (or lazily creates) the storage file at `path`.
    ///
    /// A missing file is an empty store; the file and its parent
    /// directories are created on the first write.
    ///
    /// # Errors
    /// - [`StorageError::Io`] if the file exists but can't be read
    /// - [`StorageError::Corrupt`] if it isn't a JSON string map
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => JsonCodec.decode(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), keys = values.len(), "opened session storage");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = JsonCodec.encode(values)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock();
        if values.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&values)
    }
}
