use std::collections::BTreeMap;

use serde_json::Value;
use uuid::Uuid;

use super::{RawCollection, RecordStore, Result};

/// Volatile store used by tests and embedders that persist elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: BTreeMap<String, RawCollection>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.collections.values().all(BTreeMap::is_empty)
    }
}

impl RecordStore for MemoryStore {
    fn read_collection(&self, collection: &str) -> Result<RawCollection> {
        Ok(self.collections.get(collection).cloned().unwrap_or_default())
    }

    fn read_record(&self, collection: &str, id: Uuid) -> Result<Option<Value>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|records| records.get(&id))
            .cloned())
    }

    fn write_record(&mut self, collection: &str, id: Uuid, value: Value) -> Result<()> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, value);
        Ok(())
    }

    fn remove_record(&mut self, collection: &str, id: Uuid) -> Result<bool> {
        Ok(self
            .collections
            .get_mut(collection)
            .and_then(|records| records.remove(&id))
            .is_some())
    }
}
