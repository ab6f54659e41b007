use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::core::services::{
    distribution_service::DistributionService, plan_service::PlanService,
    wastage_service::WastageService, ServiceResult,
};
use crate::domain::{
    CounterBatch, DistributionRecord, PlanStatus, PrasadCategory, SevaPrasadLink, TrackingMethod,
    WastageRecord,
};
use crate::storage::RecordStore;

/// Progress of one plan. `expected` and `distributed` are in the plan's
/// tracking unit: servings for annadan, batch units for counters, kilograms
/// for seva prasad.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub plan_id: Uuid,
    pub name: String,
    pub category: PrasadCategory,
    pub status: PlanStatus,
    pub expected: f64,
    pub distributed: f64,
    pub remaining: f64,
    /// Sum of wastage records, in the units of the wasted items.
    pub wasted: f64,
    pub distribution_count: usize,
    pub batches: Vec<CounterBatch>,
    pub seva_links: Vec<SevaPrasadLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub category: PrasadCategory,
    pub plans: usize,
    pub distributions: usize,
    pub distributed: f64,
    pub wasted: f64,
}

pub struct SummaryService;

impl SummaryService {
    pub fn plan_summary<S: RecordStore>(store: &S, plan_id: Uuid) -> ServiceResult<PlanSummary> {
        let plan = PlanService::get(store, plan_id)?;
        let distributions = DistributionService::records_for_plan(store, plan_id)?;
        let wastage = WastageService::records_for_plan(store, plan_id)?;

        let (expected, distributed) = match plan.category.tracking() {
            TrackingMethod::CountOnly => (
                f64::from(plan.annadan_expected_count.unwrap_or(0)),
                f64::from(plan.annadan_actual_count),
            ),
            TrackingMethod::UnitBased => (
                plan.batches.iter().map(|batch| batch.quantity).sum(),
                plan.batches.iter().map(|batch| batch.distributed).sum(),
            ),
            TrackingMethod::SevaBased => (
                plan.seva_links.iter().map(|link| link.expected_quantity).sum(),
                plan.seva_links
                    .iter()
                    .map(|link| link.distributed_quantity)
                    .sum(),
            ),
        };

        Ok(PlanSummary {
            plan_id: plan.id,
            name: plan.name,
            category: plan.category,
            status: plan.status,
            expected,
            distributed,
            remaining: (expected - distributed).max(0.0),
            wasted: total_wasted(&wastage),
            distribution_count: distributions.len(),
            batches: plan.batches,
            seva_links: plan.seva_links,
        })
    }

    /// Totals per category for plans dated `date`, in category order.
    pub fn daily_totals<S: RecordStore>(
        store: &S,
        date: NaiveDate,
    ) -> ServiceResult<Vec<CategoryTotals>> {
        let plans = PlanService::plans_on(store, date)?;
        let distributions: Vec<DistributionRecord> = store.get_all::<DistributionRecord>()?;
        let wastage: Vec<WastageRecord> = store.get_all::<WastageRecord>()?;

        let totals = PrasadCategory::ALL
            .into_iter()
            .map(|category| {
                let plan_ids: Vec<Uuid> = plans
                    .iter()
                    .filter(|plan| plan.category == category)
                    .map(|plan| plan.id)
                    .collect();
                let handed_out: Vec<&DistributionRecord> = distributions
                    .iter()
                    .filter(|record| plan_ids.contains(&record.plan_id))
                    .collect();
                let wasted: f64 = wastage
                    .iter()
                    .filter(|record| plan_ids.contains(&record.plan_id))
                    .map(|record| record.quantity)
                    .sum();
                CategoryTotals {
                    category,
                    plans: plan_ids.len(),
                    distributions: handed_out.len(),
                    distributed: handed_out.iter().map(|record| record.quantity).sum(),
                    wasted,
                }
            })
            .collect();
        Ok(totals)
    }
}

fn total_wasted(records: &[WastageRecord]) -> f64 {
    records.iter().map(|record| record.quantity).sum()
}
