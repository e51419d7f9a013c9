use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::Cache;

/// File-backed cache shared across sequential process lifetimes.
///
/// The whole entry map is loaded from the backing file at construction and
/// held in memory; mutations mark the cache dirty and [`sync`](Self::sync)
/// writes the map back out. Persistence is atomic: the map is serialized to
/// a temporary file in the same directory and renamed over the backing file,
/// so a concurrent writer can never leave a torn file behind — last writer
/// wins, no merge.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    entries: RwLock<HashMap<String, Value>>,
    modified: RwLock<bool>,
}

impl FileCache {
    /// Open a cache backed by `path`. A missing or unreadable file starts
    /// the cache empty; a corrupt file is discarded with a warning.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, Value>>(&bytes) {
                Ok(entries) => {
                    debug!(path = %path.display(), entries = entries.len(), "cache file loaded");
                    entries
                }
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "discarding unreadable cache file");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            entries: RwLock::new(entries),
            modified: RwLock::new(false),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current entries to the backing file via a temporary file
    /// and an atomic rename, and clear the dirty flag.
    pub fn sync(&self) -> std::io::Result<()> {
        let entries = self
            .entries
            .read()
            .map_err(|_| std::io::Error::other("cache lock poisoned"))?;
        let data = serde_json::to_vec(&*entries)?;
        drop(entries);

        let directory = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut temp = match directory {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        temp.write_all(&data)?;
        temp.persist(&self.path)
            .map_err(|error| error.error)?;

        if let Ok(mut modified) = self.modified.write() {
            *modified = false;
        }
        debug!(path = %self.path.display(), "cache file synchronized");
        Ok(())
    }

    fn mark_modified(&self) {
        if let Ok(mut modified) = self.modified.write() {
            *modified = true;
        }
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn store(&self, key: &str, value: Value) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value);
        }
        self.mark_modified();
    }

    fn exists(&self, key: &str) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }

    fn clear(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
        self.mark_modified();
    }

    fn clear_all(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
        self.mark_modified();
    }
}

impl Drop for FileCache {
    fn drop(&mut self) {
        let dirty = self.modified.read().map(|m| *m).unwrap_or(false);
        if !dirty {
            return;
        }
        if let Err(error) = self.sync() {
            warn!(path = %self.path.display(), error = %error, "failed to persist cache on drop");
        }
    }
}
