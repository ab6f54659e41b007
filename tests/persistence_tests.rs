mod common;

use std::fs;

use prasad_ledger::{
    config::{Config, ConfigManager},
    core::services::{PlanDraft, PlanService},
    domain::{InventoryItem, KitchenPlan, PrasadCategory, PrasadItem},
    storage::{Baseline, JsonStore, MemoryStore, OverlayStore, RecordStore},
    PrasadLedger,
};

use common::{clock, counter_draft, festival_day, seva_link, setup_json_env};

#[test]
fn plan_with_nested_entities_roundtrips_through_json() {
    let (mut store, _config) = setup_json_env();
    let plan = PlanService::create(&mut store, &clock(), counter_draft()).unwrap();
    let laddu = plan.items[0].id;
    PlanService::add_counter_batch(&mut store, &clock(), plan.id, laddu, 250.0).unwrap();
    PlanService::add_counter_batch(&mut store, &clock(), plan.id, laddu, 250.0).unwrap();
    let saved = PlanService::get(&store, plan.id).unwrap();

    let reopened = JsonStore::new(Some(store.base_dir().to_path_buf()), Some(3)).unwrap();
    let loaded: KitchenPlan = reopened.get(plan.id).unwrap().unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(loaded.batches.len(), 2);
    assert_eq!(loaded.items.len(), 1);
}

#[test]
fn seva_links_survive_reload() {
    let (mut store, _config) = setup_json_env();
    let draft = PlanDraft::new("Pulihora", festival_day(), "T1", PrasadCategory::SevaPrasadFree)
        .with_seva_link(seva_link("darshan", 120, 0.15))
        .with_seva_link(seva_link("suprabhatam", 40, 0.15))
        .with_item(PrasadItem::new("Tamarind rice", 24.0, "kg"));
    let plan = PlanService::create(&mut store, &clock(), draft).unwrap();

    let reopened = JsonStore::new(Some(store.base_dir().to_path_buf()), None).unwrap();
    let loaded: KitchenPlan = reopened.get(plan.id).unwrap().unwrap();
    assert_eq!(loaded, plan);
    assert_eq!(loaded.seva_links.len(), 2);
}

#[test]
fn backup_restores_previous_collections() {
    let (mut store, _config) = setup_json_env();
    let plan = PlanService::create(&mut store, &clock(), counter_draft()).unwrap();
    let backup = store.backup(Some("before festival")).unwrap();
    let name = backup
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap()
        .to_string();

    assert!(PlanService::delete(&mut store, plan.id).unwrap());
    assert!(store.get::<KitchenPlan>(plan.id).unwrap().is_none());

    store.restore_backup(&name).unwrap();
    assert!(store.get::<KitchenPlan>(plan.id).unwrap().is_some());
    assert_eq!(store.list_backups().unwrap().len(), 1);
}

#[test]
fn baseline_file_overlays_user_records() {
    let (store, _config) = setup_json_env();
    let seed = InventoryItem::new("Rice", "kg");
    let seed_path = store.base_dir().join("baseline.json");
    fs::write(
        &seed_path,
        serde_json::to_string(&serde_json::json!({ "inventory_items": [seed] })).unwrap(),
    )
    .unwrap();

    let baseline = Baseline::from_path(&seed_path).unwrap();
    let mut overlay = OverlayStore::new(baseline, MemoryStore::new());
    overlay.put(&InventoryItem::new("Ghee", "kg")).unwrap();

    let items: Vec<InventoryItem> = overlay.get_all().unwrap();
    assert_eq!(items.len(), 2);
    assert!(!overlay.delete::<InventoryItem>(seed.id).unwrap());
    assert!(overlay.get::<InventoryItem>(seed.id).unwrap().is_some());
    assert!(overlay.inner().get::<InventoryItem>(seed.id).unwrap().is_none());
}

#[test]
fn opened_ledger_uses_stored_config() {
    let (store, config_manager) = setup_json_env();
    let mut config = Config::default();
    config.seva_rates.paid_per_booking = 0.25;
    config_manager.save(&config).unwrap();

    let ledger = PrasadLedger::open(Some(store.base_dir().to_path_buf())).unwrap();
    assert_eq!(ledger.config().seva_rates.paid_per_booking, 0.25);

    let reloaded = ConfigManager::with_base_dir(store.base_dir().to_path_buf())
        .unwrap()
        .load()
        .unwrap();
    assert_eq!(reloaded, config);
}
