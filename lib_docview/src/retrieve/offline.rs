//! # Offline Cache
//!
//! Successful responses keyed by request URL, replayed by the transport when
//! the network is unreachable. Three stores are provided:
//!
//! - [`MemoryOfflineCache`]: process-lifetime map.
//! - [`FileOfflineCache`]: one JSON file per URL under a directory, named by
//!   the SHA-256 of the URL, so cached pages survive restarts.
//! - [`DisabledOfflineCache`]: stores nothing, finds nothing.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::configs::TransportConfig;
use crate::retrieve::transport::RequestRecord;

/// Storage for replayable responses.
pub trait OfflineCache: Send + Sync {
    /// Stores `record` under `key`, replacing any previous entry.
    fn store(&self, key: &str, record: &RequestRecord);

    /// The record stored under `key`, if any.
    fn lookup(&self, key: &str) -> Option<RequestRecord>;
}

/// The cache described by `config`: disabled when offline replay is off,
/// file-backed when a directory is configured, in-memory otherwise.
pub fn from_config(config: &TransportConfig) -> io::Result<Arc<dyn OfflineCache>> {
    if !config.offline {
        return Ok(Arc::new(DisabledOfflineCache));
    }
    match &config.offline_cache_dir {
        Some(dir) => Ok(Arc::new(FileOfflineCache::open(dir)?)),
        None => Ok(Arc::new(MemoryOfflineCache::default())),
    }
}

/// In-memory cache.
#[derive(Debug, Default)]
pub struct MemoryOfflineCache {
    entries: RwLock<HashMap<String, RequestRecord>>,
}

impl MemoryOfflineCache {
    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().expect("offline cache lock poisoned").len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OfflineCache for MemoryOfflineCache {
    fn store(&self, key: &str, record: &RequestRecord) {
        self.entries
            .write()
            .expect("offline cache lock poisoned")
            .insert(key.to_string(), record.clone());
    }

    fn lookup(&self, key: &str) -> Option<RequestRecord> {
        self.entries
            .read()
            .expect("offline cache lock poisoned")
            .get(key)
            .cloned()
    }
}

/// A cache that never holds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledOfflineCache;

impl OfflineCache for DisabledOfflineCache {
    fn store(&self, _key: &str, _record: &RequestRecord) {}

    fn lookup(&self, _key: &str) -> Option<RequestRecord> {
        None
    }
}

/// One persisted entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    /// The request URL the entry was stored under.
    pub url: String,
    /// The stored response.
    #[serde(flatten)]
    pub record: RequestRecord,
}

/// Directory-backed cache.
#[derive(Debug, Clone)]
pub struct FileOfflineCache {
    dir: PathBuf,
}

impl FileOfflineCache {
    /// Opens (creating if needed) the cache directory.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the entry for `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Every readable entry in the directory, sorted by URL. Unreadable files
    /// are skipped.
    pub fn entries(&self) -> io::Result<Vec<CachedEntry>> {
        let mut entries = Vec::new();
        for item in fs::read_dir(&self.dir)? {
            let path = item?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_entry(&path) {
                Ok(entry) => entries.push(entry),
                Err(e) => log::debug!("Skipping cache file {}: {}", path.display(), e),
            }
        }
        entries.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(entries)
    }

    /// Removes every entry, returning how many files were deleted.
    pub fn clear(&self) -> io::Result<usize> {
        let mut removed = 0;
        for item in fs::read_dir(&self.dir)? {
            let path = item?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn read_entry(path: &Path) -> io::Result<CachedEntry> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

impl OfflineCache for FileOfflineCache {
    fn store(&self, key: &str, record: &RequestRecord) {
        let entry = CachedEntry {
            url: key.to_string(),
            record: record.clone(),
        };
        let path = self.entry_path(key);
        let written = serde_json::to_string(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            .and_then(|text| fs::write(&path, text));
        if let Err(e) = written {
            log::warn!("Cannot persist offline copy of {}: {}", key, e);
        }
    }

    fn lookup(&self, key: &str) -> Option<RequestRecord> {
        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }
        match read_entry(&path) {
            // Guard against the (theoretical) digest collision.
            Ok(entry) if entry.url == key => Some(entry.record),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Cannot read offline copy of {}: {}", key, e);
                None
            }
        }
    }
}
