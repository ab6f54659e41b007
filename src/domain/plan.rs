//! Kitchen plan aggregate and the entities it owns exclusively.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    category::{DistributionPoint, PrasadCategory},
    common::{is_depleted, Identifiable, NamedEntity},
};

const SECONDS_PER_DAY: i64 = 86_400;

/// Lifecycle of a kitchen plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PlanStatus {
    Draft,
    Scheduled,
    InProgress,
    Prepared,
    Distributing,
    Distributed,
    Completed,
}

impl PlanStatus {
    /// Statuses reached through the distribution ledger rather than the kitchen.
    pub fn is_distribution_phase(self) -> bool {
        self >= PlanStatus::Distributing
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Scheduled => "scheduled",
            PlanStatus::InProgress => "in-progress",
            PlanStatus::Prepared => "prepared",
            PlanStatus::Distributing => "distributing",
            PlanStatus::Distributed => "distributed",
            PlanStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kitchen progress of a single item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Pending,
    Preparing,
    Prepared,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Preparing => "preparing",
            ItemStatus::Prepared => "prepared",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Special,
}

/// When cooking starts, how long it takes, and when hand-out begins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanSchedule {
    pub start_time: NaiveTime,
    pub preparation_minutes: u32,
    pub distribution_time: NaiveTime,
}

impl PlanSchedule {
    pub fn new(start_time: NaiveTime, preparation_minutes: u32, distribution_time: NaiveTime) -> Self {
        Self {
            start_time,
            preparation_minutes,
            distribution_time,
        }
    }

    /// Time the food is ready, or `None` when preparation runs past midnight.
    pub fn ready_time(&self) -> Option<NaiveTime> {
        let (ready, wrapped) = self
            .start_time
            .overflowing_add_signed(Duration::minutes(i64::from(self.preparation_minutes)));
        (wrapped == 0).then_some(ready)
    }

    /// Distribution must not begin before preparation can finish. When
    /// preparation runs past midnight, distribution has to fall on the next
    /// day too, i.e. before the start time on the clock.
    pub fn is_consistent(&self) -> bool {
        let (ready, wrapped) = self
            .start_time
            .overflowing_add_signed(Duration::minutes(i64::from(self.preparation_minutes)));
        match wrapped {
            0 => self.distribution_time >= ready,
            SECONDS_PER_DAY => {
                self.distribution_time < self.start_time && self.distribution_time >= ready
            }
            _ => false,
        }
    }
}

/// A dish prepared as part of a plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrasadItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preparation_minutes: Option<u32>,
    #[serde(default)]
    pub status: ItemStatus,
}

impl PrasadItem {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            quantity,
            unit: unit.into(),
            preparation_minutes: None,
            status: ItemStatus::Pending,
        }
    }

    pub fn with_preparation_minutes(mut self, minutes: u32) -> Self {
        self.preparation_minutes = Some(minutes);
        self
    }
}

impl Identifiable for PrasadItem {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for PrasadItem {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CounterBatchStatus {
    #[default]
    Prepared,
    Distributing,
    Exhausted,
}

/// A production run of a counter-sold item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CounterBatch {
    pub id: Uuid,
    pub batch_number: String,
    pub item_id: Uuid,
    pub quantity: f64,
    #[serde(default)]
    pub distributed: f64,
    #[serde(default)]
    pub status: CounterBatchStatus,
    pub produced_at: DateTime<Utc>,
}

impl CounterBatch {
    pub fn new(
        batch_number: impl Into<String>,
        item_id: Uuid,
        quantity: f64,
        produced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_number: batch_number.into(),
            item_id,
            quantity,
            distributed: 0.0,
            status: CounterBatchStatus::Prepared,
            produced_at,
        }
    }

    pub fn available(&self) -> f64 {
        self.quantity - self.distributed
    }

    /// Issues units that the caller has already checked against `available`.
    pub(crate) fn issue(&mut self, quantity: f64) {
        self.distributed += quantity;
        if is_depleted(self.available()) {
            self.distributed = self.quantity;
            self.status = CounterBatchStatus::Exhausted;
        } else {
            self.status = CounterBatchStatus::Distributing;
        }
    }
}

/// Prasad owed to the devotees who booked a seva.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SevaPrasadLink {
    pub seva_id: String,
    pub seva_name: String,
    pub booking_count: u32,
    pub rate_per_booking: f64,
    pub expected_quantity: f64,
    #[serde(default)]
    pub distributed_quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_distributed_at: Option<DateTime<Utc>>,
}

impl SevaPrasadLink {
    pub fn remaining(&self) -> f64 {
        (self.expected_quantity - self.distributed_quantity).max(0.0)
    }
}

/// The central aggregate: one cooking and hand-out plan for a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KitchenPlan {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDate,
    pub temple_id: String,
    pub category: PrasadCategory,
    pub distribution_point: DistributionPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<PlanSchedule>,
    #[serde(default)]
    pub items: Vec<PrasadItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annadan_expected_count: Option<u32>,
    #[serde(default)]
    pub annadan_actual_count: u32,
    #[serde(default)]
    pub seva_links: Vec<SevaPrasadLink>,
    #[serde(default)]
    pub batches: Vec<CounterBatch>,
    pub status: PlanStatus,
    #[serde(default)]
    pub category_locked: bool,
    #[serde(default)]
    pub distribution_started: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_deducted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KitchenPlan {
    /// Either lock flag freezes the category.
    pub fn is_locked(&self) -> bool {
        self.category_locked || self.distribution_started
    }

    /// Sets both lock flags. There is no inverse operation.
    pub(crate) fn lock_for_distribution(&mut self) {
        self.category_locked = true;
        self.distribution_started = true;
    }

    pub fn item(&self, id: Uuid) -> Option<&PrasadItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn item_mut(&mut self, id: Uuid) -> Option<&mut PrasadItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn batch(&self, id: Uuid) -> Option<&CounterBatch> {
        self.batches.iter().find(|batch| batch.id == id)
    }

    pub fn batch_mut(&mut self, id: Uuid) -> Option<&mut CounterBatch> {
        self.batches.iter_mut().find(|batch| batch.id == id)
    }

    pub fn seva_link(&self, seva_id: &str) -> Option<&SevaPrasadLink> {
        self.seva_links.iter().find(|link| link.seva_id == seva_id)
    }

    pub fn seva_link_mut(&mut self, seva_id: &str) -> Option<&mut SevaPrasadLink> {
        self.seva_links.iter_mut().find(|link| link.seva_id == seva_id)
    }

    pub fn all_items_prepared(&self) -> bool {
        self.items
            .iter()
            .all(|item| item.status == ItemStatus::Prepared)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Identifiable for KitchenPlan {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for KitchenPlan {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Kitchen status implied by item progress. Returns `None` when the item
/// statuses do not imply a change.
pub fn project_status(items: &[PrasadItem]) -> Option<PlanStatus> {
    if items.is_empty() {
        return None;
    }
    if items.iter().all(|item| item.status == ItemStatus::Prepared) {
        Some(PlanStatus::Prepared)
    } else if items.iter().any(|item| item.status != ItemStatus::Pending) {
        Some(PlanStatus::InProgress)
    } else {
        None
    }
}
