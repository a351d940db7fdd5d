//! Durable key-value persistence for the session.
//!
//! Mirrors browser localStorage semantics: two string keys (`token`, and
//! `user` holding serialized JSON), last-write-wins, best-effort. A read or
//! parse failure is treated as "absent"; a write failure is logged and
//! swallowed. The store never fails visibly, and the coordinator is its
//! only writer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::warn;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

pub trait SessionStore: Send + Sync {
    /// Returns the stored value, or `None` on any read or parse error.
    fn get(&self, key: &str) -> Option<String>;

    /// Persists the value. Failures are logged, not propagated.
    fn set(&self, key: &str, value: &str);

    /// Deletes the value. Best-effort; removing an absent key is a no-op.
    fn remove(&self, key: &str);
}

/// File-backed store: one JSON object on disk, rewritten on every mutation.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_map(&self) -> Map<String, Value> {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                warn!(path = %self.path.display(), "session file is not a JSON object, ignoring");
                Map::new()
            }
        }
    }

    fn write_map(&self, map: &Map<String, Value>) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    warn!("failed to create session directory: {e}");
                    return;
                }
            }
        }
        let body = Value::Object(map.clone()).to_string();
        if let Err(e) = std::fs::write(&self.path, body) {
            warn!(path = %self.path.display(), "failed to write session file: {e}");
        }
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_map()
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn set(&self, key: &str, value: &str) {
        let mut map = self.read_map();
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map);
    }

    fn remove(&self, key: &str) {
        let mut map = self.read_map();
        if map.remove(key).is_some() {
            self.write_map(&map);
        }
    }
}

/// In-process store. Used when no session file is configured, and by tests.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get(TOKEN_KEY), None);
        store.set(TOKEN_KEY, "t1");
        assert_eq!(store.get(TOKEN_KEY), Some("t1".to_string()));
        store.remove(TOKEN_KEY);
        assert_eq!(store.get(TOKEN_KEY), None);
        // Removing twice is a no-op, not an error.
        store.remove(TOKEN_KEY);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileStore::new(path.clone());
        store.set(TOKEN_KEY, "t1");
        store.set(USER_KEY, "{\"id\":\"1\"}");
        drop(store);

        let reopened = FileStore::new(path);
        assert_eq!(reopened.get(TOKEN_KEY), Some("t1".to_string()));
        assert_eq!(reopened.get(USER_KEY), Some("{\"id\":\"1\"}".to_string()));
    }

    #[test]
    fn test_file_store_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        store.set(TOKEN_KEY, "old");
        store.set(TOKEN_KEY, "new");
        assert_eq!(store.get(TOKEN_KEY), Some("new".to_string()));
    }

    #[test]
    fn test_file_store_corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = FileStore::new(path);
        assert_eq!(store.get(TOKEN_KEY), None);

        // A write after corruption starts a fresh object.
        store.set(TOKEN_KEY, "t1");
        assert_eq!(store.get(TOKEN_KEY), Some("t1".to_string()));
    }

    #[test]
    fn test_file_store_missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("never-created.json"));
        assert_eq!(store.get(TOKEN_KEY), None);
    }
}
