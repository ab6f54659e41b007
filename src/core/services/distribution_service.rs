//! Distribution ledger. Every hand-out is checked against what the plan can
//! still give, appended as an immutable record and locks the plan category.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::core::services::{
    invalid_field, plan_service::PlanService, ServiceError, ServiceResult, ValidationErrors,
};
use crate::core::time::Clock;
use crate::domain::{
    common::quantity_le, DistributionRecord, KitchenPlan, PlanStatus, TrackingMethod,
};
use crate::storage::RecordStore;

const SEVA_UNIT: &str = "kg";
const COUNT_UNIT: &str = "servings";
const BATCH_UNIT: &str = "units";

/// A request to hand out prasad from a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionEntry {
    pub plan_id: Uuid,
    pub quantity: f64,
    /// Overrides the unit derived from the plan.
    pub unit: Option<String>,
    pub batch_id: Option<Uuid>,
    pub seva_id: Option<String>,
    pub distributed_by: String,
    pub distributed_at: Option<DateTime<Utc>>,
    pub recipient_token: Option<String>,
    pub recipient_name: Option<String>,
    pub notes: Option<String>,
}

impl DistributionEntry {
    fn base(plan_id: Uuid, quantity: f64, distributed_by: impl Into<String>) -> Self {
        Self {
            plan_id,
            quantity,
            unit: None,
            batch_id: None,
            seva_id: None,
            distributed_by: distributed_by.into(),
            distributed_at: None,
            recipient_token: None,
            recipient_name: None,
            notes: None,
        }
    }

    /// Servings handed out by an annadan plan.
    pub fn count(plan_id: Uuid, servings: u32, distributed_by: impl Into<String>) -> Self {
        Self::base(plan_id, f64::from(servings), distributed_by)
    }

    /// Units sold from a counter batch.
    pub fn from_batch(
        plan_id: Uuid,
        batch_id: Uuid,
        quantity: f64,
        distributed_by: impl Into<String>,
    ) -> Self {
        Self {
            batch_id: Some(batch_id),
            ..Self::base(plan_id, quantity, distributed_by)
        }
    }

    /// Prasad given to devotees of a linked seva.
    pub fn for_seva(
        plan_id: Uuid,
        seva_id: impl Into<String>,
        quantity: f64,
        distributed_by: impl Into<String>,
    ) -> Self {
        Self {
            seva_id: Some(seva_id.into()),
            ..Self::base(plan_id, quantity, distributed_by)
        }
    }

    pub fn with_recipient(mut self, token: impl Into<String>, name: Option<String>) -> Self {
        self.recipient_token = Some(token.into());
        self.recipient_name = name;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn at(mut self, distributed_at: DateTime<Utc>) -> Self {
        self.distributed_at = Some(distributed_at);
        self
    }
}

pub struct DistributionService;

impl DistributionService {
    /// Records a hand-out. All checks run before the plan is touched, so a
    /// rejected entry leaves both the plan and the ledger unchanged.
    ///
    /// The plan is written first. If appending the record then fails, the
    /// stored plan is put back as it was loaded.
    pub fn record<S: RecordStore>(
        store: &mut S,
        clock: &dyn Clock,
        entry: DistributionEntry,
    ) -> ServiceResult<DistributionRecord> {
        let snapshot = PlanService::get(store, entry.plan_id)?;
        let mut plan = snapshot.clone();

        let mut errors = ValidationErrors::new();
        if !(entry.quantity.is_finite() && entry.quantity > 0.0) {
            errors.push("quantity", "must be greater than zero");
        }
        if entry.distributed_by.trim().is_empty() {
            errors.push("distributed_by", "must not be empty");
        }
        errors.into_result()?;

        if plan.status >= PlanStatus::Distributed
            || (plan.status < PlanStatus::Prepared && !plan.items.is_empty())
        {
            return Err(ServiceError::InvalidTransition {
                plan_id: plan.id,
                from: plan.status,
                to: PlanStatus::Distributing,
            });
        }

        let distributed_at = entry.distributed_at.unwrap_or_else(|| clock.now());
        let (label, unit) = Self::apply(&mut plan, &entry, distributed_at)?;

        let record = DistributionRecord {
            id: Uuid::new_v4(),
            plan_id: plan.id,
            category: plan.category,
            point: plan.distribution_point,
            date: plan.date,
            distributed_at,
            quantity: entry.quantity,
            unit: entry.unit.unwrap_or(unit),
            label,
            batch_id: entry.batch_id,
            seva_id: entry.seva_id,
            distributed_by: entry.distributed_by,
            recipient_token: entry.recipient_token,
            recipient_name: entry.recipient_name,
            notes: entry.notes,
            created_at: clock.now(),
        };

        if !plan.is_locked() {
            tracing::info!(plan = %plan.id, category = %plan.category, "category locked by first distribution");
        }
        plan.lock_for_distribution();
        if plan.status < PlanStatus::Distributing {
            plan.status = PlanStatus::Distributing;
        }
        plan.touch(clock.now());
        store.put(&plan)?;
        if let Err(err) = store.put(&record) {
            tracing::error!(plan = %plan.id, error = %err, "distribution record not stored, restoring plan");
            store.put(&snapshot)?;
            return Err(err.into());
        }
        tracing::info!(
            plan = %plan.id,
            quantity = record.quantity,
            unit = %record.unit,
            label = %record.label,
            "prasad distributed"
        );
        Ok(record)
    }

    /// Checks the entry against the plan's tracking method and applies it to
    /// the in-memory plan. Returns the record label and default unit.
    fn apply(
        plan: &mut KitchenPlan,
        entry: &DistributionEntry,
        distributed_at: DateTime<Utc>,
    ) -> ServiceResult<(String, String)> {
        let quantity = entry.quantity;
        match plan.category.tracking() {
            TrackingMethod::SevaBased => {
                let seva_id = entry
                    .seva_id
                    .as_deref()
                    .ok_or_else(|| invalid_field("seva_id", "required for seva distribution"))?;
                let link = plan
                    .seva_link_mut(seva_id)
                    .ok_or_else(|| ServiceError::not_found("seva link", seva_id))?;
                if !quantity_le(link.distributed_quantity + quantity, link.expected_quantity) {
                    tracing::warn!(seva = %seva_id, requested = quantity, "seva over-distribution rejected");
                    return Err(ServiceError::Overdistribution {
                        seva_id: seva_id.to_string(),
                        expected: link.expected_quantity,
                        distributed: link.distributed_quantity,
                        requested: quantity,
                    });
                }
                link.distributed_quantity =
                    (link.distributed_quantity + quantity).min(link.expected_quantity);
                link.last_distributed_at = Some(distributed_at);
                Ok((link.seva_name.clone(), SEVA_UNIT.to_string()))
            }
            TrackingMethod::UnitBased => {
                let batch_id = entry
                    .batch_id
                    .ok_or_else(|| invalid_field("batch_id", "required for counter distribution"))?;
                let unit = plan
                    .batch(batch_id)
                    .and_then(|batch| plan.item(batch.item_id))
                    .map_or_else(|| BATCH_UNIT.to_string(), |item| item.unit.clone());
                let batch = plan
                    .batch_mut(batch_id)
                    .ok_or_else(|| ServiceError::not_found("counter batch", batch_id))?;
                if !quantity_le(quantity, batch.available()) {
                    return Err(ServiceError::InsufficientBatch {
                        batch_id,
                        batch_number: batch.batch_number.clone(),
                        available: batch.available(),
                        requested: quantity,
                    });
                }
                batch.issue(quantity);
                Ok((batch.batch_number.clone(), unit))
            }
            TrackingMethod::CountOnly => {
                if quantity.fract() != 0.0 || quantity > f64::from(u32::MAX) {
                    return Err(invalid_field("quantity", "must be a whole number of servings"));
                }
                plan.annadan_actual_count = plan.annadan_actual_count.saturating_add(quantity as u32);
                Ok((plan.name.clone(), COUNT_UNIT.to_string()))
            }
        }
    }

    /// Closes distribution for a plan that is currently distributing.
    pub fn finish_distribution<S: RecordStore>(
        store: &mut S,
        clock: &dyn Clock,
        plan_id: Uuid,
    ) -> ServiceResult<KitchenPlan> {
        PlanService::transition(
            store,
            clock,
            plan_id,
            PlanStatus::Distributing,
            PlanStatus::Distributed,
        )
    }

    /// Ledger entries of a plan, oldest first.
    pub fn records_for_plan<S: RecordStore>(
        store: &S,
        plan_id: Uuid,
    ) -> ServiceResult<Vec<DistributionRecord>> {
        Self::filtered(store, |record| record.plan_id == plan_id)
    }

    pub fn records_on<S: RecordStore>(
        store: &S,
        date: NaiveDate,
    ) -> ServiceResult<Vec<DistributionRecord>> {
        Self::filtered(store, |record| record.date == date)
    }

    fn filtered<S: RecordStore>(
        store: &S,
        keep: impl Fn(&DistributionRecord) -> bool,
    ) -> ServiceResult<Vec<DistributionRecord>> {
        let mut records: Vec<DistributionRecord> = store
            .get_all::<DistributionRecord>()?
            .into_iter()
            .filter(|record| keep(record))
            .collect();
        records.sort_by_key(|record| record.distributed_at);
        Ok(records)
    }
}
