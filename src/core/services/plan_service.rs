//! Kitchen plan lifecycle: creation, edits, kitchen progress and stock
//! deduction. Everything from `distributing` on is driven by the
//! distribution ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SevaRates;
use crate::core::services::{
    allocator::{AllocationResult, FifoAllocator},
    invalid_field,
    seva_service::SevaCalculator,
    ServiceError, ServiceResult, ValidationErrors,
};
use crate::core::time::Clock;
use crate::domain::{
    common::{is_depleted, quantity_le, QUANTITY_EPSILON},
    is_valid_pair, project_status, CounterBatch, DistributionPoint, ItemStatus, KitchenPlan,
    MealType, PlanSchedule, PlanStatus, PrasadCategory, PrasadItem, Seva, SevaPrasadLink,
    TrackingMethod,
};
use crate::storage::RecordStore;

/// Everything needed to open a new plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanDraft {
    pub name: String,
    pub date: NaiveDate,
    pub temple_id: String,
    pub category: PrasadCategory,
    pub distribution_point: DistributionPoint,
    pub meal_type: Option<MealType>,
    pub schedule: Option<PlanSchedule>,
    pub items: Vec<PrasadItem>,
    pub annadan_expected_count: Option<u32>,
    pub seva_links: Vec<SevaPrasadLink>,
    pub notes: Option<String>,
}

impl PlanDraft {
    /// Starts a draft at the category's required distribution point.
    pub fn new(
        name: impl Into<String>,
        date: NaiveDate,
        temple_id: impl Into<String>,
        category: PrasadCategory,
    ) -> Self {
        Self {
            name: name.into(),
            date,
            temple_id: temple_id.into(),
            category,
            distribution_point: category.metadata().required_point,
            meal_type: None,
            schedule: None,
            items: Vec::new(),
            annadan_expected_count: None,
            seva_links: Vec::new(),
            notes: None,
        }
    }

    pub fn at(mut self, point: DistributionPoint) -> Self {
        self.distribution_point = point;
        self
    }

    pub fn with_item(mut self, item: PrasadItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_expected_count(mut self, count: u32) -> Self {
        self.annadan_expected_count = Some(count);
        self
    }

    pub fn with_seva_link(mut self, link: SevaPrasadLink) -> Self {
        self.seva_links.push(link);
        self
    }

    pub fn with_meal_type(mut self, meal_type: MealType) -> Self {
        self.meal_type = Some(meal_type);
        self
    }

    pub fn with_schedule(mut self, schedule: PlanSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }
}

/// Partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanPatch {
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub temple_id: Option<String>,
    pub category: Option<PrasadCategory>,
    pub distribution_point: Option<DistributionPoint>,
    pub meal_type: Option<MealType>,
    pub schedule: Option<PlanSchedule>,
    pub items: Option<Vec<PrasadItem>>,
    pub annadan_expected_count: Option<u32>,
    pub seva_links: Option<Vec<SevaPrasadLink>>,
    pub notes: Option<String>,
}

/// What `mark_prepared` does when stock cannot cover the plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShortagePolicy {
    /// Refuse to prepare; inventory is left untouched.
    Abort,
    /// Deduct whatever is available and report the rest.
    #[default]
    ProceedWithWarning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortageKind {
    ItemNotFound,
    InsufficientStock,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockShortfall {
    pub item_name: String,
    pub requested: f64,
    pub available: f64,
    pub kind: ShortageKind,
}

impl StockShortfall {
    pub fn missing(&self) -> f64 {
        (self.requested - self.available).max(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct PreparationReport {
    pub plan: KitchenPlan,
    pub allocations: Vec<AllocationResult>,
    pub shortfalls: Vec<StockShortfall>,
}

impl PreparationReport {
    pub fn is_fully_stocked(&self) -> bool {
        self.shortfalls.is_empty()
    }
}

pub struct PlanService;

impl PlanService {
    pub fn create<S: RecordStore>(
        store: &mut S,
        clock: &dyn Clock,
        draft: PlanDraft,
    ) -> ServiceResult<KitchenPlan> {
        let now = clock.now();
        let plan = KitchenPlan {
            id: Uuid::new_v4(),
            name: draft.name,
            date: draft.date,
            temple_id: draft.temple_id,
            category: draft.category,
            distribution_point: draft.distribution_point,
            meal_type: draft.meal_type,
            schedule: draft.schedule,
            items: draft.items,
            annadan_expected_count: draft.annadan_expected_count,
            annadan_actual_count: 0,
            seva_links: draft.seva_links,
            batches: Vec::new(),
            status: PlanStatus::Draft,
            category_locked: false,
            distribution_started: false,
            stock_deducted_at: None,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
        };
        Self::validate(&plan)?;
        store.put(&plan)?;
        tracing::info!(plan = %plan.id, name = %plan.name, category = %plan.category, "plan created");
        Ok(plan)
    }

    pub fn get<S: RecordStore>(store: &S, plan_id: Uuid) -> ServiceResult<KitchenPlan> {
        store
            .get::<KitchenPlan>(plan_id)?
            .ok_or_else(|| ServiceError::not_found("kitchen plan", plan_id))
    }

    /// Plans ordered by date, then name.
    pub fn list<S: RecordStore>(store: &S) -> ServiceResult<Vec<KitchenPlan>> {
        let mut plans = store.get_all::<KitchenPlan>()?;
        plans.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
        Ok(plans)
    }

    pub fn plans_on<S: RecordStore>(store: &S, date: NaiveDate) -> ServiceResult<Vec<KitchenPlan>> {
        Ok(Self::list(store)?
            .into_iter()
            .filter(|plan| plan.date == date)
            .collect())
    }

    pub fn update<S: RecordStore>(
        store: &mut S,
        clock: &dyn Clock,
        plan_id: Uuid,
        patch: PlanPatch,
    ) -> ServiceResult<KitchenPlan> {
        let mut plan = Self::get(store, plan_id)?;
        if plan.status == PlanStatus::Completed {
            return Err(ServiceError::ImmutablePlan {
                plan_id,
                reason: "plan is completed".into(),
            });
        }
        if let Some(requested) = patch.category {
            if requested != plan.category && plan.is_locked() {
                tracing::warn!(plan = %plan_id, current = %plan.category, %requested, "category change rejected");
                return Err(ServiceError::CategoryLocked {
                    plan_id,
                    current: plan.category,
                    requested,
                });
            }
        }
        if plan.is_locked() {
            if patch
                .distribution_point
                .is_some_and(|point| point != plan.distribution_point)
            {
                return Err(immutable(plan_id, "distribution point is fixed once distribution has started"));
            }
            if patch.items.is_some() {
                return Err(immutable(plan_id, "items are fixed once distribution has started"));
            }
            if patch.seva_links.is_some() {
                return Err(immutable(plan_id, "seva links are fixed once distribution has started"));
            }
        }
        if patch.items.is_some() && plan.stock_deducted_at.is_some() {
            return Err(immutable(plan_id, "stock has already been deducted for these items"));
        }

        if let Some(category) = patch.category {
            if category != plan.category {
                plan.category = category;
                if patch.distribution_point.is_none() {
                    plan.distribution_point = category.metadata().required_point;
                }
            }
        }
        if let Some(point) = patch.distribution_point {
            plan.distribution_point = point;
        }
        if let Some(name) = patch.name {
            plan.name = name;
        }
        if let Some(date) = patch.date {
            plan.date = date;
        }
        if let Some(temple_id) = patch.temple_id {
            plan.temple_id = temple_id;
        }
        if let Some(meal_type) = patch.meal_type {
            plan.meal_type = Some(meal_type);
        }
        if let Some(schedule) = patch.schedule {
            plan.schedule = Some(schedule);
        }
        if let Some(count) = patch.annadan_expected_count {
            plan.annadan_expected_count = Some(count);
        }
        if let Some(links) = patch.seva_links {
            plan.seva_links = links;
        }
        if let Some(notes) = patch.notes {
            plan.notes = Some(notes);
        }
        if let Some(items) = patch.items {
            plan.items = items;
            reproject(&mut plan);
        }

        Self::validate(&plan)?;
        plan.touch(clock.now());
        store.put(&plan)?;
        tracing::info!(plan = %plan.id, "plan updated");
        Ok(plan)
    }

    /// Moves a draft onto the kitchen schedule.
    pub fn schedule<S: RecordStore>(
        store: &mut S,
        clock: &dyn Clock,
        plan_id: Uuid,
    ) -> ServiceResult<KitchenPlan> {
        Self::transition(store, clock, plan_id, PlanStatus::Draft, PlanStatus::Scheduled)
    }

    /// Closes a plan whose distribution has finished.
    pub fn complete<S: RecordStore>(
        store: &mut S,
        clock: &dyn Clock,
        plan_id: Uuid,
    ) -> ServiceResult<KitchenPlan> {
        Self::transition(store, clock, plan_id, PlanStatus::Distributed, PlanStatus::Completed)
    }

    pub(crate) fn transition<S: RecordStore>(
        store: &mut S,
        clock: &dyn Clock,
        plan_id: Uuid,
        from: PlanStatus,
        to: PlanStatus,
    ) -> ServiceResult<KitchenPlan> {
        let mut plan = Self::get(store, plan_id)?;
        if plan.status != from {
            return Err(ServiceError::InvalidTransition {
                plan_id,
                from: plan.status,
                to,
            });
        }
        plan.status = to;
        plan.touch(clock.now());
        store.put(&plan)?;
        tracing::info!(plan = %plan_id, %from, %to, "plan status changed");
        Ok(plan)
    }

    /// Updates the kitchen progress of one item and re-derives the plan status.
    pub fn advance_item_status<S: RecordStore>(
        store: &mut S,
        clock: &dyn Clock,
        plan_id: Uuid,
        item_id: Uuid,
        status: ItemStatus,
    ) -> ServiceResult<KitchenPlan> {
        let mut plan = Self::get(store, plan_id)?;
        if plan.status.is_distribution_phase() {
            return Err(immutable(plan_id, "item progress is frozen once distribution starts"));
        }
        if plan.stock_deducted_at.is_some() && status != ItemStatus::Prepared {
            return Err(immutable(plan_id, "stock has already been deducted for these items"));
        }
        let item = plan
            .item_mut(item_id)
            .ok_or_else(|| ServiceError::not_found("plan item", item_id))?;
        item.status = status;
        reproject(&mut plan);
        plan.touch(clock.now());
        store.put(&plan)?;
        tracing::debug!(plan = %plan_id, item = %item_id, %status, plan_status = %plan.status, "item status advanced");
        Ok(plan)
    }

    /// Deducts the ingredients of every item from inventory and marks the plan prepared.
    ///
    /// Stock demand is aggregated per item name. Under [`ShortagePolicy::Abort`]
    /// the whole demand is previewed first and any shortfall aborts without
    /// touching inventory. Otherwise available stock is deducted and the
    /// shortfalls are returned in the report.
    pub fn mark_prepared<S: RecordStore>(
        store: &mut S,
        clock: &dyn Clock,
        plan_id: Uuid,
        policy: ShortagePolicy,
    ) -> ServiceResult<PreparationReport> {
        let mut plan = Self::get(store, plan_id)?;
        if plan.status.is_distribution_phase() {
            return Err(ServiceError::InvalidTransition {
                plan_id,
                from: plan.status,
                to: PlanStatus::Prepared,
            });
        }
        if plan.stock_deducted_at.is_some() {
            return Err(ServiceError::Invalid(format!(
                "Stock for plan `{}` was already deducted",
                plan.name
            )));
        }
        let mut unprepared = ValidationErrors::new();
        for (index, item) in plan.items.iter().enumerate() {
            if item.status != ItemStatus::Prepared {
                unprepared.push(
                    format!("items[{index}].status"),
                    format!("`{}` is {}", item.name, item.status),
                );
            }
        }
        unprepared.into_result()?;

        let demand = aggregate_demand(&plan.items);
        if policy == ShortagePolicy::Abort {
            let mut shortfalls = Vec::new();
            for (name, quantity) in &demand {
                match FifoAllocator::preview(store, name, *quantity) {
                    Ok(preview) if !preview.is_complete() => shortfalls.push(StockShortfall {
                        item_name: name.clone(),
                        requested: *quantity,
                        available: preview.allocated,
                        kind: ShortageKind::InsufficientStock,
                    }),
                    Ok(_) => {}
                    Err(ServiceError::ItemNotFound { .. }) => {
                        shortfalls.push(not_stocked(name, *quantity))
                    }
                    Err(err) => return Err(err),
                }
            }
            if !shortfalls.is_empty() {
                tracing::warn!(plan = %plan_id, shortages = shortfalls.len(), "preparation aborted");
                return Err(ServiceError::StockShortage {
                    plan_id,
                    shortfalls,
                });
            }
        }

        let reason = format!("plan {} ({})", plan.name, plan.id);
        let mut allocations = Vec::new();
        let mut shortfalls = Vec::new();
        for (name, quantity) in demand {
            match FifoAllocator::allocate(store, clock, &name, quantity, &reason) {
                Ok(allocation) => allocations.push(allocation),
                Err(ServiceError::ItemNotFound { .. }) => {
                    shortfalls.push(not_stocked(&name, quantity))
                }
                Err(ServiceError::InsufficientStock { allocated, .. }) => {
                    shortfalls.push(StockShortfall {
                        item_name: name,
                        requested: quantity,
                        available: allocated,
                        kind: ShortageKind::InsufficientStock,
                    })
                }
                Err(err) => return Err(err),
            }
        }
        if !shortfalls.is_empty() {
            tracing::warn!(plan = %plan_id, shortages = shortfalls.len(), "plan prepared with stock shortages");
        }

        let now = clock.now();
        plan.status = PlanStatus::Prepared;
        plan.stock_deducted_at = Some(now);
        plan.touch(now);
        store.put(&plan)?;
        tracing::info!(plan = %plan_id, items = allocations.len(), "plan prepared");
        Ok(PreparationReport {
            plan,
            allocations,
            shortfalls,
        })
    }

    /// Removes a plan. Returns `false` when the store kept it (baseline data).
    pub fn delete<S: RecordStore>(store: &mut S, plan_id: Uuid) -> ServiceResult<bool> {
        let plan = Self::get(store, plan_id)?;
        if plan.distribution_started
            || matches!(plan.status, PlanStatus::Distributed | PlanStatus::Completed)
        {
            return Err(immutable(plan_id, "distribution has started"));
        }
        let removed = store.delete::<KitchenPlan>(plan_id)?;
        tracing::info!(plan = %plan_id, removed, "plan deleted");
        Ok(removed)
    }

    /// Adds a production run for a counter-sold item. Batch numbers run
    /// `B001`, `B002`, ... per plan.
    pub fn add_counter_batch<S: RecordStore>(
        store: &mut S,
        clock: &dyn Clock,
        plan_id: Uuid,
        item_id: Uuid,
        quantity: f64,
    ) -> ServiceResult<CounterBatch> {
        let mut plan = Self::get(store, plan_id)?;
        if plan.category.tracking() != TrackingMethod::UnitBased {
            return Err(ServiceError::Invalid(format!(
                "{} plans do not use counter batches",
                plan.category
            )));
        }
        if plan.status >= PlanStatus::Distributed {
            return Err(immutable(plan_id, "distribution has finished"));
        }
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(invalid_field("quantity", "must be greater than zero"));
        }
        if plan.item(item_id).is_none() {
            return Err(ServiceError::not_found("plan item", item_id));
        }
        let now = clock.now();
        let batch = CounterBatch::new(
            format!("B{:03}", plan.batches.len() + 1),
            item_id,
            quantity,
            now,
        );
        plan.batches.push(batch.clone());
        plan.touch(now);
        store.put(&plan)?;
        tracing::info!(plan = %plan_id, batch = %batch.batch_number, quantity, "counter batch added");
        Ok(batch)
    }

    /// Links (or relinks) a directory seva to a seva-based plan.
    pub fn link_seva<S: RecordStore>(
        store: &mut S,
        clock: &dyn Clock,
        plan_id: Uuid,
        seva: &Seva,
        rates: &SevaRates,
        rate_override: Option<f64>,
    ) -> ServiceResult<KitchenPlan> {
        let mut plan = Self::get(store, plan_id)?;
        if plan.status >= PlanStatus::Distributed {
            return Err(immutable(plan_id, "distribution has finished"));
        }
        let link = SevaCalculator::build_link(plan.category, seva, rates, rate_override)?;
        SevaCalculator::link_seva(&mut plan, link)?;
        plan.touch(clock.now());
        store.put(&plan)?;
        tracing::info!(plan = %plan_id, seva = %seva.id, "seva linked");
        Ok(plan)
    }

    /// Checks the category/point pair, then collects every field problem.
    fn validate(plan: &KitchenPlan) -> ServiceResult<()> {
        if !is_valid_pair(plan.category, plan.distribution_point) {
            return Err(ServiceError::IncompatibleCategoryPoint {
                category: plan.category,
                point: plan.distribution_point,
            });
        }

        let mut errors = ValidationErrors::new();
        if plan.name.trim().is_empty() {
            errors.push("name", "must not be empty");
        }
        if plan.temple_id.trim().is_empty() {
            errors.push("temple_id", "must not be empty");
        }
        if plan.category == PrasadCategory::Annadan
            && !plan.annadan_expected_count.is_some_and(|count| count > 0)
        {
            errors.push("annadan_expected_count", "annadan plans need an expected count above zero");
        }
        if plan.category.is_seva_based() {
            if plan.seva_links.is_empty() {
                errors.push("seva_links", "seva plans need at least one linked seva");
            }
        } else if !plan.seva_links.is_empty() {
            errors.push("seva_links", "only seva plans carry seva links");
        }
        for (index, link) in plan.seva_links.iter().enumerate() {
            if link.seva_id.trim().is_empty() {
                errors.push(format!("seva_links[{index}].seva_id"), "must not be empty");
            }
            if !(link.rate_per_booking.is_finite() && link.rate_per_booking > 0.0) {
                errors.push(
                    format!("seva_links[{index}].rate_per_booking"),
                    "must be greater than zero",
                );
            }
            let derived = SevaCalculator::expected_quantity(link.booking_count, link.rate_per_booking);
            if (link.expected_quantity - derived).abs() > QUANTITY_EPSILON {
                errors.push(
                    format!("seva_links[{index}].expected_quantity"),
                    format!("must equal bookings x rate ({derived})"),
                );
            }
            if !plan.is_locked() && !is_depleted(link.distributed_quantity) {
                errors.push(
                    format!("seva_links[{index}].distributed_quantity"),
                    "only recorded distributions may raise it",
                );
            }
            if !quantity_le(link.distributed_quantity, link.expected_quantity) {
                errors.push(
                    format!("seva_links[{index}].expected_quantity"),
                    "must not be below the quantity already distributed",
                );
            }
            if plan.seva_links[..index]
                .iter()
                .any(|other| other.seva_id == link.seva_id)
            {
                errors.push(format!("seva_links[{index}].seva_id"), "seva is linked twice");
            }
        }
        for (index, item) in plan.items.iter().enumerate() {
            if item.name.trim().is_empty() {
                errors.push(format!("items[{index}].name"), "must not be empty");
            }
            if !(item.quantity.is_finite() && item.quantity > 0.0) {
                errors.push(format!("items[{index}].quantity"), "must be greater than zero");
            }
            if item.unit.trim().is_empty() {
                errors.push(format!("items[{index}].unit"), "must not be empty");
            }
        }
        if plan.schedule.is_some_and(|schedule| !schedule.is_consistent()) {
            errors.push(
                "schedule.distribution_time",
                "distribution cannot start before preparation finishes",
            );
        }
        errors.into_result()
    }
}

fn immutable(plan_id: Uuid, reason: &str) -> ServiceError {
    ServiceError::ImmutablePlan {
        plan_id,
        reason: reason.to_string(),
    }
}

fn not_stocked(name: &str, quantity: f64) -> StockShortfall {
    StockShortfall {
        item_name: name.to_string(),
        requested: quantity,
        available: 0.0,
        kind: ShortageKind::ItemNotFound,
    }
}

/// Applies the kitchen status implied by item progress. Distribution-phase
/// statuses are never overwritten.
fn reproject(plan: &mut KitchenPlan) {
    if plan.status.is_distribution_phase() {
        return;
    }
    if let Some(status) = project_status(&plan.items) {
        plan.status = status;
    }
}

/// Sums item quantities per name (case-insensitive), keeping first-seen order.
fn aggregate_demand(items: &[PrasadItem]) -> Vec<(String, f64)> {
    let mut demand: Vec<(String, f64)> = Vec::new();
    for item in items {
        let key = item.name.trim();
        match demand
            .iter_mut()
            .find(|(name, _)| name.to_lowercase() == key.to_lowercase())
        {
            Some((_, quantity)) => *quantity += item.quantity,
            None => demand.push((key.to_string(), item.quantity)),
        }
    }
    demand
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::{DistributionEntry, DistributionService, InventoryService};
    use crate::core::time::FixedClock;
    use crate::domain::InventoryItem;
    use crate::storage::MemoryStore;
    use chrono::{NaiveTime, TimeZone, Utc};

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 1, 14, 5, 30, 0).unwrap())
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 14).unwrap()
    }

    fn annadan_draft() -> PlanDraft {
        PlanDraft::new("Pongal annadan", day(), "T1", PrasadCategory::Annadan)
            .with_expected_count(500)
            .with_item(PrasadItem::new("Rice", 40.0, "kg"))
            .with_item(PrasadItem::new("Moong Dal", 10.0, "kg"))
    }

    fn seva(id: &str, slots: u32) -> Seva {
        Seva {
            id: id.into(),
            name: format!("Seva {id}"),
            is_free: false,
            booking_slots: slots,
            timing_blocks: Vec::new(),
            temple_id: "T1".into(),
        }
    }

    fn stock(store: &mut MemoryStore, name: &str, quantity: f64) {
        let item_id = InventoryService::add_item(store, InventoryItem::new(name, "kg")).unwrap();
        InventoryService::receive_stock(store, &clock(), item_id, day(), quantity, None).unwrap();
    }

    fn prepare_all(store: &mut MemoryStore, plan: &KitchenPlan) {
        for item in &plan.items {
            PlanService::advance_item_status(store, &clock(), plan.id, item.id, ItemStatus::Prepared)
                .unwrap();
        }
    }

    #[test]
    fn create_starts_as_unlocked_draft() {
        let mut store = MemoryStore::new();
        let plan = PlanService::create(&mut store, &clock(), annadan_draft()).unwrap();
        assert_eq!(plan.status, PlanStatus::Draft);
        assert!(!plan.category_locked);
        assert!(!plan.distribution_started);
        assert_eq!(PlanService::get(&store, plan.id).unwrap(), plan);
    }

    #[test]
    fn create_rejects_incompatible_point() {
        let mut store = MemoryStore::new();
        let draft = annadan_draft().at(DistributionPoint::Counter);
        let err = PlanService::create(&mut store, &clock(), draft).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::IncompatibleCategoryPoint {
                category: PrasadCategory::Annadan,
                point: DistributionPoint::Counter,
            }
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn create_collects_every_field_error() {
        let mut store = MemoryStore::new();
        let start = NaiveTime::from_hms_opt(6, 0, 0).unwrap();
        let draft = PlanDraft::new("", day(), "T1", PrasadCategory::Annadan)
            .with_item(PrasadItem::new("Rice", 0.0, "kg"))
            .with_schedule(PlanSchedule::new(start, 180, start));
        let err = PlanService::create(&mut store, &clock(), draft).unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        assert!(errors.has_field("name"));
        assert!(errors.has_field("annadan_expected_count"));
        assert!(errors.has_field("items[0].quantity"));
        assert!(errors.has_field("schedule.distribution_time"));
        assert_eq!(errors.errors().len(), 4);
    }

    #[test]
    fn seva_plan_requires_links() {
        let mut store = MemoryStore::new();
        let draft = PlanDraft::new("Abhishekam prasad", day(), "T1", PrasadCategory::SevaPrasadPaid);
        let err = PlanService::create(&mut store, &clock(), draft).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref errors) if errors.has_field("seva_links")));
    }

    #[test]
    fn unlocked_category_change_moves_point() {
        let mut store = MemoryStore::new();
        let plan = PlanService::create(&mut store, &clock(), annadan_draft()).unwrap();
        let patch = PlanPatch {
            category: Some(PrasadCategory::CounterPaid),
            ..PlanPatch::default()
        };
        let updated = PlanService::update(&mut store, &clock(), plan.id, patch).unwrap();
        assert_eq!(updated.category, PrasadCategory::CounterPaid);
        assert_eq!(updated.distribution_point, DistributionPoint::Counter);
    }

    #[test]
    fn locked_category_cannot_change() {
        let mut store = MemoryStore::new();
        let mut plan = PlanService::create(&mut store, &clock(), annadan_draft()).unwrap();
        plan.lock_for_distribution();
        store.put(&plan).unwrap();

        let patch = PlanPatch {
            category: Some(PrasadCategory::CounterPaid),
            ..PlanPatch::default()
        };
        let err = PlanService::update(&mut store, &clock(), plan.id, patch).unwrap_err();
        assert!(matches!(err, ServiceError::CategoryLocked { .. }));

        // Same category is not a change.
        let patch = PlanPatch {
            category: Some(PrasadCategory::Annadan),
            notes: Some("second sitting".into()),
            ..PlanPatch::default()
        };
        assert!(PlanService::update(&mut store, &clock(), plan.id, patch).is_ok());
    }

    #[test]
    fn locked_plan_keeps_point_items_and_links() {
        let mut store = MemoryStore::new();
        let mut plan = PlanService::create(&mut store, &clock(), annadan_draft()).unwrap();
        plan.lock_for_distribution();
        store.put(&plan).unwrap();

        let patches = [
            PlanPatch {
                distribution_point: Some(DistributionPoint::Counter),
                ..PlanPatch::default()
            },
            PlanPatch {
                items: Some(vec![PrasadItem::new("Curd rice", 20.0, "kg")]),
                ..PlanPatch::default()
            },
            PlanPatch {
                seva_links: Some(Vec::new()),
                ..PlanPatch::default()
            },
        ];
        for patch in patches {
            let err = PlanService::update(&mut store, &clock(), plan.id, patch).unwrap_err();
            assert!(matches!(err, ServiceError::ImmutablePlan { .. }));
        }
        assert_eq!(PlanService::get(&store, plan.id).unwrap(), plan);
    }

    #[test]
    fn items_fixed_once_stock_is_deducted() {
        let mut store = MemoryStore::new();
        stock(&mut store, "Rice", 50.0);
        stock(&mut store, "Moong Dal", 12.0);
        let plan = PlanService::create(&mut store, &clock(), annadan_draft()).unwrap();
        prepare_all(&mut store, &plan);
        PlanService::mark_prepared(&mut store, &clock(), plan.id, ShortagePolicy::Abort).unwrap();

        let patch = PlanPatch {
            items: Some(vec![PrasadItem::new("Rice", 45.0, "kg")]),
            ..PlanPatch::default()
        };
        let err = PlanService::update(&mut store, &clock(), plan.id, patch).unwrap_err();
        assert!(matches!(err, ServiceError::ImmutablePlan { .. }));

        let patch = PlanPatch {
            notes: Some("served in two sittings".into()),
            ..PlanPatch::default()
        };
        assert!(PlanService::update(&mut store, &clock(), plan.id, patch).is_ok());
    }

    #[test]
    fn seva_link_quantities_must_be_derived() {
        let mut store = MemoryStore::new();
        let mut inflated = SevaCalculator::build_link(
            PrasadCategory::SevaPrasadPaid,
            &seva("archana", 10),
            &SevaRates::default(),
            None,
        )
        .unwrap();
        inflated.expected_quantity = 1000.0;
        let draft = PlanDraft::new("Archana prasad", day(), "T1", PrasadCategory::SevaPrasadPaid)
            .with_seva_link(inflated);
        let err = PlanService::create(&mut store, &clock(), draft).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ref errors) if errors.has_field("seva_links[0].expected_quantity")
        ));

        let mut prefilled = SevaCalculator::build_link(
            PrasadCategory::SevaPrasadPaid,
            &seva("archana", 10),
            &SevaRates::default(),
            None,
        )
        .unwrap();
        prefilled.distributed_quantity = 1.5;
        let draft = PlanDraft::new("Archana prasad", day(), "T1", PrasadCategory::SevaPrasadPaid)
            .with_seva_link(prefilled);
        let err = PlanService::create(&mut store, &clock(), draft).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ref errors) if errors.has_field("seva_links[0].distributed_quantity")
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn relinking_keeps_distributed_quantity() {
        let mut store = MemoryStore::new();
        let rates = SevaRates::default();
        let link = SevaCalculator::build_link(
            PrasadCategory::SevaPrasadPaid,
            &seva("abhishekam", 225),
            &rates,
            None,
        )
        .unwrap();
        let draft = PlanDraft::new("Abhishekam prasad", day(), "T1", PrasadCategory::SevaPrasadPaid)
            .with_seva_link(link);
        let plan = PlanService::create(&mut store, &clock(), draft).unwrap();
        DistributionService::record(
            &mut store,
            &clock(),
            DistributionEntry::for_seva(plan.id, "abhishekam", 30.0, "priest"),
        )
        .unwrap();

        let plan = PlanService::link_seva(&mut store, &clock(), plan.id, &seva("abhishekam", 250), &rates, None)
            .unwrap();
        let relinked = plan.seva_link("abhishekam").unwrap();
        assert_eq!(relinked.booking_count, 250);
        assert!((relinked.expected_quantity - 50.0).abs() < 1e-9);
        assert_eq!(relinked.distributed_quantity, 30.0);
        assert!(relinked.last_distributed_at.is_some());

        let err = PlanService::link_seva(&mut store, &clock(), plan.id, &seva("abhishekam", 100), &rates, None)
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ref errors) if errors.has_field("expected_quantity")
        ));
        let stored = PlanService::get(&store, plan.id).unwrap();
        assert!((stored.seva_link("abhishekam").unwrap().expected_quantity - 50.0).abs() < 1e-9);
    }

    #[test]
    fn item_progress_drives_plan_status() {
        let mut store = MemoryStore::new();
        let plan = PlanService::create(&mut store, &clock(), annadan_draft()).unwrap();
        let rice = plan.items[0].id;
        let dal = plan.items[1].id;

        let plan = PlanService::advance_item_status(&mut store, &clock(), plan.id, rice, ItemStatus::Preparing)
            .unwrap();
        assert_eq!(plan.status, PlanStatus::InProgress);
        PlanService::advance_item_status(&mut store, &clock(), plan.id, rice, ItemStatus::Prepared)
            .unwrap();
        let plan = PlanService::advance_item_status(&mut store, &clock(), plan.id, dal, ItemStatus::Prepared)
            .unwrap();
        assert_eq!(plan.status, PlanStatus::Prepared);
    }

    #[test]
    fn mark_prepared_requires_every_item() {
        let mut store = MemoryStore::new();
        let plan = PlanService::create(&mut store, &clock(), annadan_draft()).unwrap();
        let err = PlanService::mark_prepared(&mut store, &clock(), plan.id, ShortagePolicy::Abort)
            .unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        assert!(errors.has_field("items[0].status"));
        assert!(errors.has_field("items[1].status"));
    }

    #[test]
    fn mark_prepared_deducts_stock_once() {
        let mut store = MemoryStore::new();
        stock(&mut store, "Rice", 50.0);
        stock(&mut store, "Moong Dal", 12.0);
        let plan = PlanService::create(&mut store, &clock(), annadan_draft()).unwrap();
        prepare_all(&mut store, &plan);

        let report =
            PlanService::mark_prepared(&mut store, &clock(), plan.id, ShortagePolicy::Abort).unwrap();
        assert!(report.is_fully_stocked());
        assert_eq!(report.allocations.len(), 2);
        assert_eq!(report.plan.status, PlanStatus::Prepared);
        assert!(report.plan.stock_deducted_at.is_some());

        let rice = InventoryService::resolve(&store, "Rice").unwrap().item;
        assert_eq!(InventoryService::current_stock(&store, rice.id).unwrap(), 10.0);

        let again = PlanService::mark_prepared(&mut store, &clock(), plan.id, ShortagePolicy::Abort);
        assert!(matches!(again, Err(ServiceError::Invalid(_))));
    }

    #[test]
    fn abort_policy_leaves_inventory_untouched() {
        let mut store = MemoryStore::new();
        stock(&mut store, "Rice", 50.0);
        stock(&mut store, "Moong Dal", 4.0);
        let plan = PlanService::create(&mut store, &clock(), annadan_draft()).unwrap();
        prepare_all(&mut store, &plan);

        let err = PlanService::mark_prepared(&mut store, &clock(), plan.id, ShortagePolicy::Abort)
            .unwrap_err();
        let ServiceError::StockShortage { shortfalls, .. } = err else {
            panic!("expected stock shortage");
        };
        assert_eq!(shortfalls.len(), 1);
        assert_eq!(shortfalls[0].item_name, "Moong Dal");
        assert_eq!(shortfalls[0].missing(), 6.0);

        let rice = InventoryService::resolve(&store, "Rice").unwrap().item;
        assert_eq!(InventoryService::current_stock(&store, rice.id).unwrap(), 50.0);
        assert!(PlanService::get(&store, plan.id).unwrap().stock_deducted_at.is_none());
    }

    #[test]
    fn proceed_policy_reports_shortfalls() {
        let mut store = MemoryStore::new();
        stock(&mut store, "Rice", 50.0);
        let plan = PlanService::create(&mut store, &clock(), annadan_draft()).unwrap();
        prepare_all(&mut store, &plan);

        let report = PlanService::mark_prepared(
            &mut store,
            &clock(),
            plan.id,
            ShortagePolicy::ProceedWithWarning,
        )
        .unwrap();
        assert_eq!(report.allocations.len(), 1);
        assert_eq!(report.shortfalls.len(), 1);
        assert_eq!(report.shortfalls[0].kind, ShortageKind::ItemNotFound);
        assert_eq!(report.plan.status, PlanStatus::Prepared);
    }

    #[test]
    fn transitions_follow_lifecycle() {
        let mut store = MemoryStore::new();
        let plan = PlanService::create(&mut store, &clock(), annadan_draft()).unwrap();
        let plan = PlanService::schedule(&mut store, &clock(), plan.id).unwrap();
        assert_eq!(plan.status, PlanStatus::Scheduled);

        let err = PlanService::complete(&mut store, &clock(), plan.id).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InvalidTransition {
                from: PlanStatus::Scheduled,
                to: PlanStatus::Completed,
                ..
            }
        ));
    }

    #[test]
    fn delete_blocked_after_distribution_starts() {
        let mut store = MemoryStore::new();
        let draft_plan = PlanService::create(&mut store, &clock(), annadan_draft()).unwrap();
        assert!(PlanService::delete(&mut store, draft_plan.id).unwrap());

        let mut plan = PlanService::create(&mut store, &clock(), annadan_draft()).unwrap();
        plan.lock_for_distribution();
        store.put(&plan).unwrap();
        let err = PlanService::delete(&mut store, plan.id).unwrap_err();
        assert!(matches!(err, ServiceError::ImmutablePlan { .. }));
    }

    #[test]
    fn counter_batches_are_numbered_per_plan() {
        let mut store = MemoryStore::new();
        let draft = PlanDraft::new("Laddu counter", day(), "T1", PrasadCategory::CounterPaid)
            .with_item(PrasadItem::new("Laddu", 200.0, "pcs"));
        let plan = PlanService::create(&mut store, &clock(), draft).unwrap();
        let laddu = plan.items[0].id;

        let first = PlanService::add_counter_batch(&mut store, &clock(), plan.id, laddu, 100.0).unwrap();
        let second = PlanService::add_counter_batch(&mut store, &clock(), plan.id, laddu, 100.0).unwrap();
        assert_eq!(first.batch_number, "B001");
        assert_eq!(second.batch_number, "B002");
        assert_eq!(PlanService::get(&store, plan.id).unwrap().batches.len(), 2);

        let annadan = PlanService::create(&mut store, &clock(), annadan_draft()).unwrap();
        let err = PlanService::add_counter_batch(&mut store, &clock(), annadan.id, annadan.items[0].id, 5.0)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[test]
    fn demand_is_aggregated_by_name() {
        let items = vec![
            PrasadItem::new("Rice", 10.0, "kg"),
            PrasadItem::new("rice ", 5.0, "kg"),
            PrasadItem::new("Ghee", 1.0, "kg"),
        ];
        let demand = aggregate_demand(&items);
        assert_eq!(demand, vec![("Rice".to_string(), 15.0), ("Ghee".to_string(), 1.0)]);
    }
}
