//! Append-only audit entries written by the distribution and wastage ledgers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    category::{DistributionPoint, PrasadCategory},
    common::Identifiable,
};

/// One hand-out event. Never mutated after it is stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DistributionRecord {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub category: PrasadCategory,
    pub point: DistributionPoint,
    /// Service day of the plan; `distributed_at` keeps the exact instant.
    pub date: NaiveDate,
    pub distributed_at: DateTime<Utc>,
    pub quantity: f64,
    pub unit: String,
    /// Item name, batch number or seva name the quantity was drawn from.
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seva_id: Option<String>,
    pub distributed_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for DistributionRecord {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Spoiled or lost prasad. Never mutated after it is stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WastageRecord {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub quantity: f64,
    pub unit: String,
    pub reason: String,
    pub recorded_by: String,
    pub recorded_at: DateTime<Utc>,
}

impl Identifiable for WastageRecord {
    fn id(&self) -> Uuid {
        self.id
    }
}
