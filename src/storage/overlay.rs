use std::{collections::BTreeMap, fs, path::Path};

use serde_json::Value;
use uuid::Uuid;

use crate::errors::LedgerError;

use super::{RawCollection, Record, RecordStore, Result};

/// Seed dataset shipped with a deployment. Baseline records are read-only:
/// they can be shadowed by user edits but never removed.
#[derive(Debug, Clone, Default)]
pub struct Baseline {
    collections: BTreeMap<String, RawCollection>,
}

impl Baseline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record<T: Record>(mut self, record: &T) -> Result<Self> {
        let value = serde_json::to_value(record)?;
        self.collections
            .entry(T::COLLECTION.to_string())
            .or_default()
            .insert(record.id(), value);
        Ok(self)
    }

    /// Loads a seed file shaped as `{ "<collection>": [ { "id": ..., ... } ] }`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let raw: BTreeMap<String, Vec<Value>> = serde_json::from_str(&data)?;
        let mut collections = BTreeMap::new();
        for (collection, records) in raw {
            let mut entries = RawCollection::new();
            for value in records {
                let id = value
                    .get("id")
                    .and_then(Value::as_str)
                    .and_then(|raw_id| Uuid::parse_str(raw_id).ok())
                    .ok_or_else(|| {
                        LedgerError::InvalidRef(format!(
                            "baseline record in `{}` has no valid id",
                            collection
                        ))
                    })?;
                entries.insert(id, value);
            }
            collections.insert(collection, entries);
        }
        Ok(Self { collections })
    }

    pub fn contains(&self, collection: &str, id: Uuid) -> bool {
        self.collections
            .get(collection)
            .is_some_and(|records| records.contains_key(&id))
    }

    fn collection(&self, collection: &str) -> RawCollection {
        self.collections.get(collection).cloned().unwrap_or_default()
    }
}

/// Layers user-created and user-modified records over a [`Baseline`].
#[derive(Debug, Clone)]
pub struct OverlayStore<S> {
    baseline: Baseline,
    inner: S,
}

impl<S: RecordStore> OverlayStore<S> {
    pub fn new(baseline: Baseline, inner: S) -> Self {
        Self { baseline, inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: RecordStore> RecordStore for OverlayStore<S> {
    fn read_collection(&self, collection: &str) -> Result<RawCollection> {
        let mut merged = self.baseline.collection(collection);
        merged.extend(self.inner.read_collection(collection)?);
        Ok(merged)
    }

    fn read_record(&self, collection: &str, id: Uuid) -> Result<Option<Value>> {
        match self.inner.read_record(collection, id)? {
            Some(value) => Ok(Some(value)),
            None => Ok(self
                .baseline
                .collections
                .get(collection)
                .and_then(|records| records.get(&id))
                .cloned()),
        }
    }

    fn write_record(&mut self, collection: &str, id: Uuid, value: Value) -> Result<()> {
        self.inner.write_record(collection, id, value)
    }

    fn remove_record(&mut self, collection: &str, id: Uuid) -> Result<bool> {
        if self.baseline.contains(collection, id) {
            tracing::debug!(collection, %id, "ignoring delete of baseline record");
            return Ok(false);
        }
        self.inner.remove_record(collection, id)
    }
}
