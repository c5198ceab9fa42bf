//! Content-addressed result cache for SweepstacX
//!
//! Each entry is one JSON file under the cache directory, named by the hex
//! SHA-256 of `(operation, path, content hash)`. Entries carry the schema
//! version they were written with and their creation time; an entry from
//! another schema version or older than the configured maximum age reads
//! as a miss.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, trace};

/// Cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Corrupt cache entry: {0}")]
    Parse(#[from] serde_json::Error),
}

/// On-disk layout version; bump when [`CacheEntry`] changes shape
pub const CACHE_FORMAT: u32 = 1;

/// Default maximum entry age
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Hex SHA-256 of file text
pub fn content_hash(text: &str) -> String {
    hex(&Sha256::digest(text.as_bytes()))
}

/// Hex SHA-256 over the NUL-separated key components
pub fn cache_key(operation: &str, path: &Path, content_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update([0u8]);
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update([0u8]);
    hasher.update(content_hash.as_bytes());
    hex(&hasher.finalize())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A stored cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub key: String,
    /// Creation time in milliseconds since the UNIX epoch
    pub created_at: u64,
    pub schema_version: String,
    pub payload: T,
}

/// Persistent key/value store for per-file results.
///
/// Safe to share between workers: writes go to a unique temporary file and
/// are renamed into place, so a reader sees either a whole entry or none.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: Option<PathBuf>,
    schema_version: String,
    max_age: Duration,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, schema_version: impl Into<String>) -> Self {
        Self {
            dir: Some(dir.into()),
            schema_version: schema_version.into(),
            max_age: DEFAULT_MAX_AGE,
        }
    }

    /// A store that never hits and never writes
    pub fn disabled() -> Self {
        Self {
            dir: None,
            schema_version: String::new(),
            max_age: DEFAULT_MAX_AGE,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Look up a payload.
    ///
    /// Absent, expired and version-mismatched entries are `Ok(None)`; an
    /// unreadable or undecodable entry is an error the caller should treat
    /// as a miss.
    pub fn get<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &Path,
        content_hash: &str,
    ) -> Result<Option<T>, CacheError> {
        let Some(dir) = &self.dir else {
            return Ok(None);
        };

        let key = cache_key(operation, path, content_hash);
        let entry_path = entry_path(dir, &key);

        let raw = match fs::read(&entry_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Decode the envelope first so a payload of another shape from an
        // older schema reads as a version miss, not corruption
        let entry: CacheEntry<serde_json::Value> = serde_json::from_slice(&raw)?;

        if entry.schema_version != self.schema_version || entry.key != key {
            trace!("Stale cache entry for {}", path.display());
            let _ = fs::remove_file(&entry_path);
            return Ok(None);
        }

        let age = Duration::from_millis(now_millis().saturating_sub(entry.created_at));
        if age > self.max_age {
            trace!("Expired cache entry for {}", path.display());
            let _ = fs::remove_file(&entry_path);
            return Ok(None);
        }

        Ok(Some(serde_json::from_value(entry.payload)?))
    }

    /// Store a payload, replacing any previous entry for the same key
    pub fn set<T: Serialize>(
        &self,
        operation: &str,
        path: &Path,
        content_hash: &str,
        payload: &T,
    ) -> Result<(), CacheError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let key = cache_key(operation, path, content_hash);
        let entry = CacheEntry {
            key,
            created_at: now_millis(),
            schema_version: self.schema_version.clone(),
            payload,
        };

        fs::create_dir_all(dir)?;
        let bytes = serde_json::to_vec(&entry)?;
        write_atomic(&entry_path(dir, &entry.key), &bytes)
    }

    /// Remove every entry and leftover temporary file.
    ///
    /// Only files the store itself names are touched. The directory is
    /// removed afterwards if that left it empty.
    pub fn invalidate_all(&self) -> Result<(), CacheError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if (entry_key(name).is_some() || is_temp_file(name)) && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }

        // Fails while anything else is still inside
        if fs::remove_dir(dir).is_err() {
            debug!("Left non-cache files in {}", dir.display());
        }
        debug!("Cleared {} cache files at {}", removed, dir.display());
        Ok(())
    }

    /// Remove entries whose key is not in `live`; returns how many went
    pub fn prune(&self, live: &HashSet<String>) -> Result<usize, CacheError> {
        let Some(dir) = &self.dir else {
            return Ok(0);
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(entry_key) else {
                continue;
            };
            if live.contains(key) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                // Another scan got there first
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    /// Number of entry files currently on disk
    pub fn entry_count(&self) -> usize {
        let Some(dir) = &self.dir else {
            return 0;
        };
        fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_name().to_str().and_then(entry_key).is_some())
                    .count()
            })
            .unwrap_or(0)
    }
}

fn entry_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

/// The key of an entry file name, `<64 hex digits>.json`
fn entry_key(file_name: &str) -> Option<&str> {
    let key = file_name.strip_suffix(".json")?;
    (key.len() == 64 && key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))).then_some(key)
}

/// Temporary files written by [`write_atomic`]: `<key>.tmp.<pid>.<seq>`
fn is_temp_file(file_name: &str) -> bool {
    file_name
        .split_once(".tmp.")
        .map(|(key, _)| entry_key(&format!("{key}.json")).is_some())
        .unwrap_or(false)
}

fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp = target.with_extension(format!("tmp.{}.{}", std::process::id(), seq));
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, target) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
