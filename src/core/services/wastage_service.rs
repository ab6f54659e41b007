use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::services::{plan_service::PlanService, ServiceError, ServiceResult, ValidationErrors};
use crate::core::time::Clock;
use crate::domain::WastageRecord;
use crate::storage::RecordStore;

#[derive(Debug, Clone, PartialEq)]
pub struct WastageEntry {
    pub plan_id: Uuid,
    pub item_id: Uuid,
    pub quantity: f64,
    pub reason: String,
    pub recorded_by: String,
    pub recorded_at: Option<DateTime<Utc>>,
}

impl WastageEntry {
    pub fn new(
        plan_id: Uuid,
        item_id: Uuid,
        quantity: f64,
        reason: impl Into<String>,
        recorded_by: impl Into<String>,
    ) -> Self {
        Self {
            plan_id,
            item_id,
            quantity,
            reason: reason.into(),
            recorded_by: recorded_by.into(),
            recorded_at: None,
        }
    }
}

pub struct WastageService;

impl WastageService {
    /// Appends a wastage record. Has no effect on plan status or locks.
    pub fn record<S: RecordStore>(
        store: &mut S,
        clock: &dyn Clock,
        entry: WastageEntry,
    ) -> ServiceResult<WastageRecord> {
        let mut errors = ValidationErrors::new();
        if !(entry.quantity.is_finite() && entry.quantity > 0.0) {
            errors.push("quantity", "must be greater than zero");
        }
        if entry.recorded_by.trim().is_empty() {
            errors.push("recorded_by", "must not be empty");
        }
        errors.into_result()?;

        let plan = PlanService::get(store, entry.plan_id)?;
        let item = plan
            .item(entry.item_id)
            .ok_or_else(|| ServiceError::not_found("plan item", entry.item_id))?;
        let record = WastageRecord {
            id: Uuid::new_v4(),
            plan_id: plan.id,
            item_id: item.id,
            item_name: item.name.clone(),
            quantity: entry.quantity,
            unit: item.unit.clone(),
            reason: entry.reason,
            recorded_by: entry.recorded_by,
            recorded_at: entry.recorded_at.unwrap_or_else(|| clock.now()),
        };
        store.put(&record)?;
        tracing::info!(plan = %plan.id, item = %record.item_name, quantity = record.quantity, "wastage recorded");
        Ok(record)
    }

    pub fn records_for_plan<S: RecordStore>(
        store: &S,
        plan_id: Uuid,
    ) -> ServiceResult<Vec<WastageRecord>> {
        let mut records: Vec<WastageRecord> = store
            .get_all::<WastageRecord>()?
            .into_iter()
            .filter(|record| record.plan_id == plan_id)
            .collect();
        records.sort_by_key(|record| record.recorded_at);
        Ok(records)
    }
}
