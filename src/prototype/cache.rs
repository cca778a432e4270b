//! Prototype caches: in-memory and file-backed.
//!
//! Cache failures are never fatal. A missing, unreadable, or corrupt entry is
//! a miss: the analyzer simply runs again. File writes go through a uniquely
//! named temporary sibling and an atomic rename, so processes sharing a cache
//! directory cannot observe torn files.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::prototype::ServicePrototype;

const ENTRY_SUFFIX: &str = ".dat";
const MANIFEST_FILE: &str = "manifest.json";

/// Storage for analyzed prototypes.
pub trait PrototypeCache: Send + Sync {
    fn get(&self, type_id: &str) -> Option<Arc<ServicePrototype>>;
    fn set(&self, type_id: &str, prototype: Arc<ServicePrototype>);
    fn contains(&self, type_id: &str) -> bool;
    fn remove(&self, type_id: &str);
    fn clear(&self);
}

/// Process-local cache, the default backend.
#[derive(Default)]
pub struct MemoryPrototypeCache {
    entries: RwLock<HashMap<String, Arc<ServicePrototype>>>,
}

impl MemoryPrototypeCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrototypeCache for MemoryPrototypeCache {
    fn get(&self, type_id: &str) -> Option<Arc<ServicePrototype>> {
        self.entries.read().unwrap().get(type_id).cloned()
    }

    fn set(&self, type_id: &str, prototype: Arc<ServicePrototype>) {
        self.entries
            .write()
            .unwrap()
            .insert(type_id.to_string(), prototype);
    }

    fn contains(&self, type_id: &str) -> bool {
        self.entries.read().unwrap().contains_key(type_id)
    }

    fn remove(&self, type_id: &str) {
        self.entries.write().unwrap().remove(type_id);
    }

    fn clear(&self) {
        self.entries.write().unwrap().clear();
    }
}

/// Companion manifest recording when the cache was last written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Seconds since the Unix epoch.
    pub generated_at: u64,
}

/// Disk-backed cache: one file per type id under a directory.
///
/// Filenames are the type id with path separators replaced by `_`, suffixed
/// `.dat`. Contents are an opaque serde encoding with no compatibility
/// promise across versions.
///
/// # Examples
///
/// ```rust,no_run
/// use wirecore::prototype::{FilePrototypeCache, PrototypeCache};
///
/// let cache = FilePrototypeCache::new("/var/cache/wirecore").unwrap();
/// cache.clear();
/// ```
pub struct FilePrototypeCache {
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl FilePrototypeCache {
    /// Opens (and creates, if needed) a cache directory.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads the companion manifest, if one has been written.
    pub fn manifest(&self) -> Option<CacheManifest> {
        let bytes = fs::read(self.dir.join(MANIFEST_FILE)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn entry_path(&self, type_id: &str) -> PathBuf {
        let sanitized: String = type_id
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
            .collect();
        self.dir.join(format!("{sanitized}{ENTRY_SUFFIX}"))
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("entry");
        let serial = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .dir
            .join(format!(".{file_name}.{}.{serial}.tmp", std::process::id()));
        fs::write(&tmp, bytes)?;
        match fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Err(e)
            }
        }
    }

    fn write_manifest(&self) {
        let manifest = CacheManifest {
            generated_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        let bytes = match serde_json::to_vec(&manifest) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "failed to encode prototype cache manifest");
                return;
            }
        };
        if let Err(e) = self.write_atomic(&self.dir.join(MANIFEST_FILE), &bytes) {
            warn!(error = %e, "failed to write prototype cache manifest");
        }
    }
}

impl PrototypeCache for FilePrototypeCache {
    fn get(&self, type_id: &str) -> Option<Arc<ServicePrototype>> {
        let path = self.entry_path(type_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(type_id, error = %e, "prototype cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice::<ServicePrototype>(&bytes) {
            Ok(prototype) => Some(Arc::new(prototype)),
            Err(e) => {
                warn!(type_id, error = %e, "corrupt prototype cache entry, treating as miss");
                None
            }
        }
    }

    fn set(&self, type_id: &str, prototype: Arc<ServicePrototype>) {
        let bytes = match serde_json::to_vec(&*prototype) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(type_id, error = %e, "failed to encode prototype, skipping cache write");
                return;
            }
        };
        if let Err(e) = self.write_atomic(&self.entry_path(type_id), &bytes) {
            warn!(type_id, error = %e, "prototype cache write failed");
            return;
        }
        self.write_manifest();
    }

    fn contains(&self, type_id: &str) -> bool {
        self.entry_path(type_id).exists()
    }

    fn remove(&self, type_id: &str) {
        let path = self.entry_path(type_id);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(type_id, error = %e, "failed to remove prototype cache entry");
            }
        }
    }

    fn clear(&self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "failed to list prototype cache directory");
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(ENTRY_SUFFIX) || name == MANIFEST_FILE {
                if let Err(e) = fs::remove_file(entry.path()) {
                    warn!(error = %e, "failed to remove prototype cache entry");
                }
            }
        }
    }
}
