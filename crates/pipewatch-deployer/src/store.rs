//! Identifier store
//!
//! Persists the mapping from logical runtime name to the provider-assigned
//! identifier, so that later runs can update or delete what an earlier run
//! created. The file existing means resources may still be live.

use crate::error::StoreError;
use pipewatch_common::RuntimeIdentifier;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Logical name -> external id
pub type IdentifierMap = BTreeMap<String, String>;

/// Durable map of runtime identifiers
pub trait IdentifierStore: Send + Sync {
    /// Record an identifier, replacing any previous value for its logical name
    fn put(&self, id: &RuntimeIdentifier) -> Result<(), StoreError>;

    /// All recorded identifiers; empty when nothing was ever stored
    fn get_all(&self) -> Result<IdentifierMap, StoreError>;

    /// Forget one logical name
    fn remove(&self, logical_name: &str) -> Result<(), StoreError>;

    /// Delete the store entirely. Returns whether anything was there.
    fn clear(&self) -> Result<bool, StoreError>;

    /// Look up one logical name
    fn get(&self, logical_name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get_all()?.remove(logical_name))
    }
}

/// Identifier store backed by a pretty-printed JSON object on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn write(&self, map: &IdentifierMap) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(map).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, json + "\n").map_err(|e| self.io_error(e))
    }
}

impl IdentifierStore for JsonFileStore {
    fn put(&self, id: &RuntimeIdentifier) -> Result<(), StoreError> {
        let mut map = self.get_all()?;
        map.insert(id.logical_name.clone(), id.external_id.clone());
        self.write(&map)?;
        debug!(path = %self.path.display(), name = %id.logical_name, "Stored runtime identifier");
        Ok(())
    }

    fn get_all(&self) -> Result<IdentifierMap, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(IdentifierMap::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn remove(&self, logical_name: &str) -> Result<(), StoreError> {
        let mut map = self.get_all()?;
        if map.remove(logical_name).is_some() {
            self.write(&map)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<bool, StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Removed identifier store");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> JsonFileStore {
        JsonFileStore::new(dir.path().join("scripts").join("agent_runtime_ids.json"))
    }

    #[test]
    fn test_absent_store_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.get_all().unwrap().is_empty());
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn test_put_then_get_all() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .put(&RuntimeIdentifier::new("pipeline_error_analysis_agent", "rt-123"))
            .unwrap();

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["pipeline_error_analysis_agent"], "rt-123");
    }

    #[test]
    fn test_put_overwrites_same_name() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.put(&RuntimeIdentifier::new("agent", "old")).unwrap();
        store.put(&RuntimeIdentifier::new("agent", "new")).unwrap();
        store.put(&RuntimeIdentifier::new("other", "x")).unwrap();

        assert_eq!(store.get("agent").unwrap().as_deref(), Some("new"));
        assert_eq!(store.get_all().unwrap().len(), 2);
    }

    #[test]
    fn test_file_is_pretty_json_object() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.put(&RuntimeIdentifier::new("agent", "rt-1")).unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, serde_json::json!({ "agent": "rt-1" }));
        assert!(text.contains('\n'));
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.put(&RuntimeIdentifier::new("a", "1")).unwrap();
        store.put(&RuntimeIdentifier::new("b", "2")).unwrap();

        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));

        assert!(store.clear().unwrap());
        assert!(!store.path().exists());
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();

        assert!(matches!(store.get_all(), Err(StoreError::Parse { .. })));
    }
}
