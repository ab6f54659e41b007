mod common;

use prasad_ledger::{
    core::services::DistributionEntry,
    domain::{ItemStatus, PlanStatus},
    init,
};

use common::{annadan_draft, memory_ledger};

#[test]
fn ledger_annadan_smoke() {
    init();

    let mut ledger = memory_ledger();
    let plan = ledger.create_plan(annadan_draft(120)).unwrap();
    for item in &plan.items {
        ledger
            .advance_item_status(plan.id, item.id, ItemStatus::Prepared)
            .unwrap();
    }
    ledger
        .record_distribution(DistributionEntry::count(plan.id, 120, "hall"))
        .unwrap();

    let summary = ledger.plan_summary(plan.id).unwrap();
    assert_eq!(summary.status, PlanStatus::Distributing);
    assert_eq!(summary.remaining, 0.0);
    assert_eq!(ledger.plans().unwrap().len(), 1);
}
