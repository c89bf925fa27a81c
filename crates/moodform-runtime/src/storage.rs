#![forbid(unsafe_code)]

//! Durable key-value storage sink.
//!
//! The engine treats storage as an external collaborator with three
//! operations: `get`, `set`, `remove`. Reads and writes are synchronous and
//! fast; the single-threaded event loop serializes them naturally, so no
//! locking discipline beyond whole-value replace is required.
//!
//! Two backends ship here:
//! - [`MemoryStorage`]: in-memory, for tests and ephemeral sessions.
//! - [`FileStorage`]: one JSON object file holding all keys, written with
//!   the atomic write-then-rename pattern so a crash mid-write never leaves
//!   a torn file.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StorageError::Io` | File I/O failure | Returned; caller retries later |
//! | `StorageError::Serialization` | JSON encode/decode of the key file | Returned; treated as absent on read |
//! | `StorageError::QuotaExceeded` | Backend out of space | Returned; dirty flag stays set |
//! | `StorageError::Unavailable` | Backend cannot operate | Returned; non-fatal |

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from storage sink operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations.
    Io(std::io::Error),
    /// Encode/decode failure of the backing file.
    Serialization(String),
    /// The backend has no room left for the write.
    QuotaExceeded(String),
    /// The backend cannot currently operate.
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            StorageError::QuotaExceeded(msg) => write!(f, "quota exceeded: {msg}"),
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Sink trait
// ---------------------------------------------------------------------------

/// Durable key-value store the engine persists into.
///
/// Implementations replace whole values; there is no merge semantic.
pub trait StorageSink {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Read the value under `key`, `None` when absent.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value under `key`.
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key` if present.
    fn remove(&mut self, key: &str) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// Memory storage
// ---------------------------------------------------------------------------

/// In-memory storage for testing and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: BTreeMap<String, String>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            data: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl StorageSink for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.data.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File storage
// ---------------------------------------------------------------------------

/// File-backed storage: all keys live in one JSON object file.
///
/// # Atomic writes
///
/// 1. Write to `{path}.tmp`
/// 2. Flush
/// 3. Rename `{path}.tmp` -> `{path}`
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Create file storage at the given path.
    ///
    /// The file does not need to exist; it is created on first write.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone();
        tmp.set_extension("json.tmp");
        tmp
    }

    fn read_map(&self) -> StorageResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| StorageError::Serialization(format!("bad storage file: {e}")))
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, map)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StorageSink for FileStorage {
    fn name(&self) -> &str {
        "FileStorage"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let mut map = self.read_map().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "storage file unreadable, starting fresh");
            BTreeMap::new()
        });
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}
