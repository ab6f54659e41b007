#![allow(dead_code)]

use std::sync::Mutex;

use chrono::{NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use prasad_ledger::{
    config::{Config, ConfigManager},
    core::{services::PlanDraft, time::FixedClock},
    domain::{PrasadCategory, PrasadItem, SevaPrasadLink},
    storage::{JsonStore, MemoryStore},
    PrasadLedger,
};
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn festival_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 14).expect("valid date")
}

pub fn clock() -> FixedClock {
    FixedClock(
        Utc.with_ymd_and_hms(2025, 1, 14, 6, 0, 0)
            .single()
            .expect("valid timestamp"),
    )
}

pub fn memory_ledger() -> PrasadLedger<MemoryStore> {
    PrasadLedger::with_clock(MemoryStore::new(), Box::new(clock()), Config::default())
}

/// Creates a JSON-backed store and config manager in a unique directory.
pub fn setup_json_env() -> (JsonStore, ConfigManager) {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);

    let store = JsonStore::new(Some(base.clone()), Some(3)).expect("create json store");
    let config_manager = ConfigManager::with_base_dir(base).expect("create config manager");
    (store, config_manager)
}

pub fn annadan_draft(expected: u32) -> PlanDraft {
    PlanDraft::new("Sankranti annadan", festival_day(), "T1", PrasadCategory::Annadan)
        .with_expected_count(expected)
        .with_item(PrasadItem::new("Rice", 40.0, "kg"))
        .with_item(PrasadItem::new("Toor Dal", 8.0, "kg"))
}

pub fn counter_draft() -> PlanDraft {
    PlanDraft::new("Laddu counter", festival_day(), "T1", PrasadCategory::CounterPaid)
        .with_item(PrasadItem::new("Laddu", 500.0, "pcs"))
}

pub fn seva_link(seva_id: &str, bookings: u32, rate: f64) -> SevaPrasadLink {
    SevaPrasadLink {
        seva_id: seva_id.into(),
        seva_name: format!("{seva_id} seva"),
        booking_count: bookings,
        rate_per_booking: rate,
        expected_quantity: f64::from(bookings) * rate,
        distributed_quantity: 0.0,
        last_distributed_at: None,
    }
}
