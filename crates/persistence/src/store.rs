//! Key/value save stores.

use crate::PersistenceError;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Durable storage for serialized saves, addressed by a fixed key.
pub trait SaveStore {
    /// Stored payload for `key`, `None` when nothing was saved yet.
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    /// Replace the payload for `key`.
    fn write(&mut self, key: &str, payload: &str) -> Result<(), PersistenceError>;
    /// Delete the payload for `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SaveStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::ReadFailure(e.to_string())),
        }
    }

    fn write(&mut self, key: &str, payload: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        // The previous save survives a crash mid-write.
        fs::create_dir_all(&self.dir)
            .and_then(|_| fs::write(&tmp, payload))
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| PersistenceError::WriteFailure(e.to_string()))
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::WriteFailure(e.to_string())),
        }
    }
}

/// Process-local store for tests and headless runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slots: BTreeMap<String, String>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail, as if storage were full.
    pub fn failing() -> Self {
        Self {
            slots: BTreeMap::new(),
            fail_writes: true,
        }
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Raw payload for `key`, for inspection.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.slots.get(key).map(String::as_str)
    }

    /// Seed a raw payload, bypassing the codec.
    pub fn insert(&mut self, key: &str, payload: &str) {
        self.slots.insert(key.to_string(), payload.to_string());
    }
}

impl SaveStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.slots.get(key).cloned())
    }

    fn write(&mut self, key: &str, payload: &str) -> Result<(), PersistenceError> {
        if self.fail_writes {
            return Err(PersistenceError::WriteFailure("quota exceeded".to_string()));
        }
        self.slots.insert(key.to_string(), payload.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.slots.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("crumbs-{tag}-{}-{nanos}", std::process::id()))
    }

    #[test]
    fn file_store_roundtrip_and_remove() {
        let dir = scratch_dir("roundtrip");
        let mut store = FileStore::new(&dir);
        assert_eq!(store.read("slot").unwrap(), None);
        store.write("slot", "{\"a\":1}").unwrap();
        assert_eq!(store.read("slot").unwrap().as_deref(), Some("{\"a\":1}"));
        store.write("slot", "{\"a\":2}").unwrap();
        assert_eq!(store.read("slot").unwrap().as_deref(), Some("{\"a\":2}"));
        assert!(!store.path_for("slot").with_extension("json.tmp").exists());
        store.remove("slot").unwrap();
        store.remove("slot").unwrap();
        assert_eq!(store.read("slot").unwrap(), None);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn memory_store_can_fail_writes() {
        let mut store = MemoryStore::failing();
        assert!(matches!(
            store.write("k", "x"),
            Err(PersistenceError::WriteFailure(_))
        ));
        store.set_fail_writes(false);
        store.write("k", "x").unwrap();
        assert_eq!(store.get("k"), Some("x"));
    }
}
