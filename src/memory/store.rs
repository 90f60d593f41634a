use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::PersistenceError;

/// Opaque blob persistence used by the learning store.
pub trait KeyValueStore: Send + Sync {
    /// `Ok(None)` when nothing was ever saved under `key`.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError>;
}

/// One file per key inside a directory.
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are internal constants, but keep them from escaping the directory.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        // Write a temp file, then rename over the old blob.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Process-local store; also what the pipeline degrades to when disk fails.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        self.entries.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
