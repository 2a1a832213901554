//! Persistent store capability.
//!
//! The reconciler only needs whole-value `get`/`set` under a single key.
//! Which backing store is used is decided when the reconciler is built:
//!
//! - [`FileStore`]: one JSON file per key inside a directory
//! - [`MemoryStore`]: in-process map, shared between clones
//! - [`NullStore`]: no persistent environment at all

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::NamedTempFile;

use crate::error::StoreError;

/// Check that `key` can name a file inside a store directory.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// Key-value durable store addressed by fixed string keys.
pub trait UnlockStore {
    /// Read the raw value stored under `key`, `Ok(None)` if there is none.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Short name used in log output.
    fn describe(&self) -> String;
}

/// File-backed store. Key `k` lives in `<dir>/k.json`.
///
/// Each write goes to its own uniquely named temporary file in the same
/// directory and is renamed into place, so a reader sees either the old
/// value or one complete new value, even with several writers.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl UnlockStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::ReadFailed {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let write_failed = |source| StoreError::WriteFailed {
            key: key.to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(write_failed)?;
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(write_failed)?;
        tmp.write_all(value.as_bytes()).map_err(write_failed)?;
        tmp.persist(&path).map_err(|e| write_failed(e.error))?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.dir.display())
    }
}

/// Volatile store. Clones share the same contents, which lets tests model
/// two sessions against one store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<HashMap<String, String>>>,
    fail_writes: Rc<Cell<bool>>,
    reads: Rc<Cell<usize>>,
    writes: Rc<Cell<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one value.
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        store
    }

    /// Make every subsequent `set` fail, as a full disk or quota would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Number of `get` calls made through the trait.
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    /// Number of `set` calls made through the trait, failed ones included.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    /// Current raw value, bypassing the trait.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }
}

impl UnlockStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writes.set(self.writes.get() + 1);
        if self.fail_writes.get() {
            return Err(StoreError::WriteFailed {
                key: key.to_string(),
                source: std::io::Error::new(ErrorKind::Other, "quota exceeded"),
            });
        }
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Stand-in for an environment with no persistent store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl UnlockStore for NullStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }

    fn describe(&self) -> String {
        "null".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_missing_key_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());
        assert!(store.get("unlocked").unwrap().is_none());
    }

    #[test]
    fn file_store_overwrites_whole_value() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        store.set("unlocked", "[1,2,3]").unwrap();
        store.set("unlocked", "[1]").unwrap();

        assert_eq!(store.get("unlocked").unwrap().as_deref(), Some("[1]"));
        let leftovers = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn file_store_concurrent_writers_never_expose_partial_values() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_path_buf();
        let big = |id: u32| {
            let ids: Vec<u32> = std::iter::repeat(id).take(50_000).collect();
            serde_json::to_string(&ids).unwrap()
        };
        let values = [big(1), big(2)];

        let writers: Vec<_> = values
            .iter()
            .cloned()
            .map(|value| {
                let store = FileStore::new(&dir);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.set("unlocked", &value).unwrap();
                    }
                })
            })
            .collect();

        let reader = FileStore::new(&dir);
        while writers.iter().any(|w| !w.is_finished()) {
            if let Some(read) = reader.get("unlocked").unwrap() {
                assert!(values.contains(&read), "read a partial value of {} bytes", read.len());
            }
        }
        for writer in writers {
            writer.join().unwrap();
        }

        let last = reader.get("unlocked").unwrap().unwrap();
        assert!(values.contains(&last));
    }

    #[test]
    fn file_store_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested/path");
        let store = FileStore::new(&nested);

        store.set("unlocked", "[1]").unwrap();
        assert!(nested.join("unlocked.json").exists());
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let store = FileStore::new("/tmp");
        for key in ["", "../escape", "a/b", ".hidden"] {
            assert!(matches!(store.path_for(key), Err(StoreError::InvalidKey(_))));
        }
        assert!(store.path_for("valentine-unlocked-ids").is_ok());
        assert!(validate_key("progress.v2").is_ok());
    }

    #[test]
    fn file_store_write_failure_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the directory should be
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = FileStore::new(&blocker);

        assert!(matches!(
            store.set("unlocked", "[1]"),
            Err(StoreError::WriteFailed { .. })
        ));
    }

    #[test]
    fn memory_store_clones_share_contents() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn memory_store_counts_trait_calls() {
        let store = MemoryStore::new();
        store.get("k").unwrap();
        store.set_fail_writes(true);
        let _ = store.set("k", "v");
        assert!(store.raw("k").is_none());
        assert_eq!((store.reads(), store.writes()), (1, 1));
    }

    #[test]
    fn memory_store_can_fail_writes() {
        let store = MemoryStore::with_value("k", "old");
        store.set_fail_writes(true);
        assert!(store.set("k", "new").is_err());
        assert_eq!(store.raw("k").as_deref(), Some("old"));
    }

    #[test]
    fn null_store_reads_nothing_and_refuses_writes() {
        let store = NullStore;
        assert!(store.get("k").unwrap().is_none());
        assert!(matches!(store.set("k", "v"), Err(StoreError::Unavailable)));
    }
}
