//! Raw-material inventory consumed by the kitchen.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Identifiable, NamedEntity};

/// A raw material such as rice or ghee.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reorder_level: Option<f64>,
}

impl InventoryItem {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            unit: unit.into(),
            reorder_level: None,
        }
    }
}

impl Identifiable for InventoryItem {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for InventoryItem {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StockBatchStatus {
    #[default]
    Active,
    Consumed,
}

/// A single purchase of an inventory item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockBatch {
    pub id: Uuid,
    pub item_id: Uuid,
    pub purchase_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    pub quantity: f64,
    pub remaining_quantity: f64,
    #[serde(default)]
    pub status: StockBatchStatus,
}

impl StockBatch {
    pub fn new(item_id: Uuid, purchase_date: NaiveDate, quantity: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            purchase_date,
            expiry_date: None,
            quantity,
            remaining_quantity: quantity,
            status: StockBatchStatus::Active,
        }
    }

    pub fn with_expiry(mut self, expiry_date: NaiveDate) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == StockBatchStatus::Active
    }
}

impl Identifiable for StockBatch {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    Receipt,
    Issue,
}

/// Audit entry for every change to a stock batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockMovement {
    pub id: Uuid,
    pub item_id: Uuid,
    pub batch_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: f64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for StockMovement {
    fn id(&self) -> Uuid {
        self.id
    }
}
