use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::config::{Config, ConfigManager};
use crate::core::services::{
    AllocationResult, CategoryTotals, DistributionEntry, DistributionService, FifoAllocator,
    InventoryService, ItemResolution, PlanDraft, PlanPatch, PlanService, PlanSummary,
    PreparationReport, ServiceResult, SevaCalculator, ShortagePolicy, SummaryService,
    WastageEntry, WastageService,
};
use crate::core::time::{Clock, SystemClock};
use crate::domain::{
    metadata_of, CategoryMetadata, CounterBatch, DistributionRecord, InventoryItem, ItemStatus,
    KitchenPlan, PrasadCategory, Seva, SevaDirectory, StockBatch, WastageRecord,
};
use crate::errors::LedgerError;
use crate::storage::{BackupInfo, JsonStore, RecordStore};

/// Facade bundling a record store, a clock and the active configuration.
/// Every operation delegates to the matching service.
pub struct PrasadLedger<S: RecordStore> {
    store: S,
    clock: Box<dyn Clock>,
    config: Config,
}

impl<S: RecordStore> PrasadLedger<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self::with_clock(store, Box::new(SystemClock), config)
    }

    pub fn with_clock(store: S, clock: Box<dyn Clock>, config: Config) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    pub fn category_metadata(&self, category: PrasadCategory) -> CategoryMetadata {
        metadata_of(category)
    }

    // Plans

    pub fn create_plan(&mut self, draft: PlanDraft) -> ServiceResult<KitchenPlan> {
        PlanService::create(&mut self.store, self.clock.as_ref(), draft)
    }

    pub fn plan(&self, plan_id: Uuid) -> ServiceResult<KitchenPlan> {
        PlanService::get(&self.store, plan_id)
    }

    pub fn plans(&self) -> ServiceResult<Vec<KitchenPlan>> {
        PlanService::list(&self.store)
    }

    pub fn plans_on(&self, date: NaiveDate) -> ServiceResult<Vec<KitchenPlan>> {
        PlanService::plans_on(&self.store, date)
    }

    pub fn update_plan(&mut self, plan_id: Uuid, patch: PlanPatch) -> ServiceResult<KitchenPlan> {
        PlanService::update(&mut self.store, self.clock.as_ref(), plan_id, patch)
    }

    pub fn delete_plan(&mut self, plan_id: Uuid) -> ServiceResult<bool> {
        PlanService::delete(&mut self.store, plan_id)
    }

    pub fn schedule_plan(&mut self, plan_id: Uuid) -> ServiceResult<KitchenPlan> {
        PlanService::schedule(&mut self.store, self.clock.as_ref(), plan_id)
    }

    pub fn advance_item_status(
        &mut self,
        plan_id: Uuid,
        item_id: Uuid,
        status: ItemStatus,
    ) -> ServiceResult<KitchenPlan> {
        PlanService::advance_item_status(&mut self.store, self.clock.as_ref(), plan_id, item_id, status)
    }

    /// Marks a plan prepared using the configured shortage policy.
    pub fn mark_prepared(&mut self, plan_id: Uuid) -> ServiceResult<PreparationReport> {
        let policy = self.config.shortage_policy;
        self.mark_prepared_with(plan_id, policy)
    }

    pub fn mark_prepared_with(
        &mut self,
        plan_id: Uuid,
        policy: ShortagePolicy,
    ) -> ServiceResult<PreparationReport> {
        PlanService::mark_prepared(&mut self.store, self.clock.as_ref(), plan_id, policy)
    }

    pub fn add_counter_batch(
        &mut self,
        plan_id: Uuid,
        item_id: Uuid,
        quantity: f64,
    ) -> ServiceResult<CounterBatch> {
        PlanService::add_counter_batch(&mut self.store, self.clock.as_ref(), plan_id, item_id, quantity)
    }

    pub fn link_seva(
        &mut self,
        plan_id: Uuid,
        seva: &Seva,
        rate_override: Option<f64>,
    ) -> ServiceResult<KitchenPlan> {
        PlanService::link_seva(
            &mut self.store,
            self.clock.as_ref(),
            plan_id,
            seva,
            &self.config.seva_rates,
            rate_override,
        )
    }

    /// Links every compatible seva the directory lists for the plan's temple and date.
    pub fn link_sevas_from_directory(
        &mut self,
        plan_id: Uuid,
        directory: &dyn SevaDirectory,
    ) -> ServiceResult<KitchenPlan> {
        let plan = self.plan(plan_id)?;
        let sevas: Vec<Seva> = directory
            .sevas_by_date(plan.date)
            .into_iter()
            .filter(|seva| seva.temple_id == plan.temple_id)
            .filter(|seva| SevaCalculator::validate_link(plan.category, seva.is_free).is_ok())
            .collect();
        let mut linked = plan;
        for seva in &sevas {
            linked = self.link_seva(plan_id, seva, None)?;
        }
        Ok(linked)
    }

    pub fn complete_plan(&mut self, plan_id: Uuid) -> ServiceResult<KitchenPlan> {
        PlanService::complete(&mut self.store, self.clock.as_ref(), plan_id)
    }

    // Distribution and wastage

    /// Records a hand-out. Seva entries without a unit use the configured default.
    pub fn record_distribution(
        &mut self,
        mut entry: DistributionEntry,
    ) -> ServiceResult<DistributionRecord> {
        if entry.seva_id.is_some() && entry.unit.is_none() {
            entry.unit = Some(self.config.default_unit.clone());
        }
        DistributionService::record(&mut self.store, self.clock.as_ref(), entry)
    }

    pub fn finish_distribution(&mut self, plan_id: Uuid) -> ServiceResult<KitchenPlan> {
        DistributionService::finish_distribution(&mut self.store, self.clock.as_ref(), plan_id)
    }

    pub fn distributions_for_plan(&self, plan_id: Uuid) -> ServiceResult<Vec<DistributionRecord>> {
        DistributionService::records_for_plan(&self.store, plan_id)
    }

    pub fn record_wastage(&mut self, entry: WastageEntry) -> ServiceResult<WastageRecord> {
        WastageService::record(&mut self.store, self.clock.as_ref(), entry)
    }

    pub fn wastage_for_plan(&self, plan_id: Uuid) -> ServiceResult<Vec<WastageRecord>> {
        WastageService::records_for_plan(&self.store, plan_id)
    }

    // Inventory

    pub fn add_inventory_item(&mut self, item: InventoryItem) -> ServiceResult<Uuid> {
        InventoryService::add_item(&mut self.store, item)
    }

    pub fn receive_stock(
        &mut self,
        item_id: Uuid,
        purchase_date: NaiveDate,
        quantity: f64,
        expiry_date: Option<NaiveDate>,
    ) -> ServiceResult<StockBatch> {
        InventoryService::receive_stock(
            &mut self.store,
            self.clock.as_ref(),
            item_id,
            purchase_date,
            quantity,
            expiry_date,
        )
    }

    pub fn current_stock(&self, item_id: Uuid) -> ServiceResult<f64> {
        InventoryService::current_stock(&self.store, item_id)
    }

    pub fn resolve_item(&self, query: &str) -> ServiceResult<ItemResolution> {
        InventoryService::resolve(&self.store, query)
    }

    pub fn allocate(
        &mut self,
        item_name: &str,
        quantity: f64,
        reason: &str,
    ) -> ServiceResult<AllocationResult> {
        FifoAllocator::allocate(&mut self.store, self.clock.as_ref(), item_name, quantity, reason)
    }

    pub fn preview_allocation(&self, item_name: &str, quantity: f64) -> ServiceResult<AllocationResult> {
        FifoAllocator::preview(&self.store, item_name, quantity)
    }

    // Reporting

    pub fn plan_summary(&self, plan_id: Uuid) -> ServiceResult<PlanSummary> {
        SummaryService::plan_summary(&self.store, plan_id)
    }

    pub fn daily_totals(&self, date: NaiveDate) -> ServiceResult<Vec<CategoryTotals>> {
        SummaryService::daily_totals(&self.store, date)
    }
}

impl PrasadLedger<JsonStore> {
    /// Opens the filesystem ledger under `base` (or the default data
    /// directory), loading the stored configuration.
    pub fn open(base: Option<PathBuf>) -> Result<Self, LedgerError> {
        let base = crate::core::utils::PathResolver::resolve_base(base);
        let config = ConfigManager::with_base_dir(base.clone())?.load()?;
        let root = config.data_dir.clone().unwrap_or(base);
        let store = JsonStore::new(Some(root), Some(config.backup_retention))?;
        tracing::info!(path = %store.base_dir().display(), "ledger opened");
        Ok(Self::new(store, config))
    }

    pub fn base_dir(&self) -> &Path {
        self.store.base_dir()
    }

    pub fn backup(&self, note: Option<&str>) -> Result<PathBuf, LedgerError> {
        self.store.backup(note)
    }

    pub fn list_backups(&self) -> Result<Vec<BackupInfo>, LedgerError> {
        self.store.list_backups()
    }

    pub fn restore_backup(&self, name: &str) -> Result<(), LedgerError> {
        self.store.restore_backup(name)
    }
}
