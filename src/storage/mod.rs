//! Keyed record store seam. Services never touch files directly; they receive
//! a [`RecordStore`] and go through its typed helpers.

pub mod json_backend;
pub mod memory;
pub mod overlay;

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    domain::{
        DistributionRecord, Identifiable, InventoryItem, KitchenPlan, StockBatch, StockMovement,
        WastageRecord,
    },
    errors::LedgerError,
};

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Serialized records of one collection keyed by id.
pub type RawCollection = BTreeMap<Uuid, Value>;

/// An entity persisted in its own collection.
pub trait Record: Identifiable + Serialize + DeserializeOwned + Clone {
    const COLLECTION: &'static str;
}

impl Record for KitchenPlan {
    const COLLECTION: &'static str = "kitchen_plans";
}

impl Record for DistributionRecord {
    const COLLECTION: &'static str = "distribution_records";
}

impl Record for WastageRecord {
    const COLLECTION: &'static str = "wastage_records";
}

impl Record for InventoryItem {
    const COLLECTION: &'static str = "inventory_items";
}

impl Record for StockBatch {
    const COLLECTION: &'static str = "stock_batches";
}

impl Record for StockMovement {
    const COLLECTION: &'static str = "stock_movements";
}

/// Abstraction over persistence backends. Writes must be durable before the
/// call returns.
pub trait RecordStore: Send + Sync {
    fn read_collection(&self, collection: &str) -> Result<RawCollection>;
    fn write_record(&mut self, collection: &str, id: Uuid, value: Value) -> Result<()>;
    /// Returns `false` when nothing was removed.
    fn remove_record(&mut self, collection: &str, id: Uuid) -> Result<bool>;

    fn read_record(&self, collection: &str, id: Uuid) -> Result<Option<Value>> {
        Ok(self.read_collection(collection)?.remove(&id))
    }

    /// All records of a collection in id order.
    fn get_all<T: Record>(&self) -> Result<Vec<T>>
    where
        Self: Sized,
    {
        self.read_collection(T::COLLECTION)?
            .into_values()
            .map(|value| serde_json::from_value(value).map_err(LedgerError::from))
            .collect()
    }

    fn get<T: Record>(&self, id: Uuid) -> Result<Option<T>>
    where
        Self: Sized,
    {
        match self.read_record(T::COLLECTION, id)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn put<T: Record>(&mut self, record: &T) -> Result<()>
    where
        Self: Sized,
    {
        let value = serde_json::to_value(record)?;
        self.write_record(T::COLLECTION, record.id(), value)
    }

    fn delete<T: Record>(&mut self, id: Uuid) -> Result<bool>
    where
        Self: Sized,
    {
        self.remove_record(T::COLLECTION, id)
    }
}

pub use json_backend::{BackupInfo, JsonStore, COLLECTION_SCHEMA_VERSION};
pub use memory::MemoryStore;
pub use overlay::{Baseline, OverlayStore};
