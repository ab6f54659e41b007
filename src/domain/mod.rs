pub mod category;
pub mod common;
pub mod directory;
pub mod inventory;
pub mod plan;
pub mod records;

pub use category::{
    is_valid_pair, metadata_of, AccountingTreatment, CategoryMetadata, DistributionPoint, Linkage,
    PrasadCategory, TrackingMethod,
};
pub use common::{Identifiable, NamedEntity, QUANTITY_EPSILON};
pub use directory::{Seva, SevaDirectory, StaticDirectory, Temple, TempleDirectory, TimingBlock};
pub use inventory::{InventoryItem, MovementType, StockBatch, StockBatchStatus, StockMovement};
pub use plan::{
    project_status, CounterBatch, CounterBatchStatus, ItemStatus, KitchenPlan, MealType,
    PlanSchedule, PlanStatus, PrasadItem, SevaPrasadLink,
};
pub use records::{DistributionRecord, WastageRecord};
