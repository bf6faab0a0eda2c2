use pipewatch_common::RuntimeIdentifier;
use pipewatch_deployer::StoreError;
use pipewatch_deployer::store::{IdentifierMap, IdentifierStore};
use std::sync::Mutex;

/// Identifier store kept in memory; `None` models an absent file
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<Option<IdentifierMap>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already records one identifier
    pub fn with(logical_name: &str, external_id: &str) -> Self {
        let store = Self::new();
        store
            .put(&RuntimeIdentifier::new(logical_name, external_id))
            .unwrap();
        store
    }

    /// Whether the backing "file" exists
    pub fn exists(&self) -> bool {
        self.map.lock().unwrap().is_some()
    }
}

impl IdentifierStore for MemoryStore {
    fn put(&self, id: &RuntimeIdentifier) -> Result<(), StoreError> {
        self.map
            .lock()
            .unwrap()
            .get_or_insert_with(IdentifierMap::new)
            .insert(id.logical_name.clone(), id.external_id.clone());
        Ok(())
    }

    fn get_all(&self) -> Result<IdentifierMap, StoreError> {
        Ok(self.map.lock().unwrap().clone().unwrap_or_default())
    }

    fn remove(&self, logical_name: &str) -> Result<(), StoreError> {
        if let Some(map) = self.map.lock().unwrap().as_mut() {
            map.remove(logical_name);
        }
        Ok(())
    }

    fn clear(&self) -> Result<bool, StoreError> {
        Ok(self.map.lock().unwrap().take().is_some())
    }
}
