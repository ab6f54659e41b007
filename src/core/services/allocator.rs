//! First-in-first-out stock allocation.
//!
//! Batches are drawn oldest purchase first. A shortfall is not rolled back:
//! whatever could be drawn stays drawn and the error reports how much.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::core::services::inventory_service::{InventoryService, ItemResolution};
use crate::core::services::{invalid_field, ServiceError, ServiceResult};
use crate::core::time::Clock;
use crate::domain::{
    common::{is_depleted, QUANTITY_EPSILON},
    MovementType, StockBatch, StockBatchStatus, StockMovement,
};
use crate::storage::RecordStore;

/// Quantity taken from one stock batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDraw {
    pub batch_id: Uuid,
    pub purchase_date: NaiveDate,
    pub quantity: f64,
    pub remaining_after: f64,
    pub consumed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationResult {
    pub item_id: Uuid,
    pub item_name: String,
    pub unit: String,
    pub requested: f64,
    pub allocated: f64,
    pub draws: Vec<BatchDraw>,
    /// Other inventory items the name also matched.
    pub alternatives: Vec<String>,
}

impl AllocationResult {
    pub fn shortfall(&self) -> f64 {
        let short = self.requested - self.allocated;
        if short <= QUANTITY_EPSILON {
            0.0
        } else {
            short
        }
    }

    pub fn is_complete(&self) -> bool {
        self.shortfall() == 0.0
    }
}

pub struct FifoAllocator;

impl FifoAllocator {
    /// Draws `quantity` of the item matching `item_name`, oldest batch first,
    /// and writes one `issue` movement per batch touched.
    pub fn allocate<S: RecordStore>(
        store: &mut S,
        clock: &dyn Clock,
        item_name: &str,
        quantity: f64,
        reason: &str,
    ) -> ServiceResult<AllocationResult> {
        ensure_positive(quantity)?;
        let resolution = InventoryService::resolve(store, item_name)?;
        let mut batches = InventoryService::active_batches(store, resolution.item.id)?;
        let draws = draw_fifo(&mut batches, quantity);

        let now = clock.now();
        for draw in &draws {
            if let Some(batch) = batches.iter().find(|batch| batch.id == draw.batch_id) {
                store.put(batch)?;
            }
            let movement = StockMovement {
                id: Uuid::new_v4(),
                item_id: resolution.item.id,
                batch_id: draw.batch_id,
                movement_type: MovementType::Issue,
                quantity: draw.quantity,
                reason: reason.to_string(),
                created_at: now,
            };
            store.put(&movement)?;
        }

        let result = build_result(resolution, quantity, draws);
        if !result.is_complete() {
            tracing::warn!(
                item = %result.item_name,
                requested = quantity,
                allocated = result.allocated,
                "stock ran out during allocation"
            );
            return Err(ServiceError::InsufficientStock {
                item: result.item_name.clone(),
                requested: quantity,
                allocated: result.allocated,
                shortfall: result.shortfall(),
            });
        }
        tracing::info!(
            item = %result.item_name,
            quantity,
            batches = result.draws.len(),
            reason,
            "stock allocated"
        );
        Ok(result)
    }

    /// Computes the draws an allocation would make without touching the store.
    /// A short result is returned as `Ok` with a non-zero shortfall.
    pub fn preview<S: RecordStore>(
        store: &S,
        item_name: &str,
        quantity: f64,
    ) -> ServiceResult<AllocationResult> {
        ensure_positive(quantity)?;
        let resolution = InventoryService::resolve(store, item_name)?;
        let mut batches = InventoryService::active_batches(store, resolution.item.id)?;
        let draws = draw_fifo(&mut batches, quantity);
        Ok(build_result(resolution, quantity, draws))
    }
}

fn ensure_positive(quantity: f64) -> ServiceResult<()> {
    if quantity.is_finite() && quantity > 0.0 {
        Ok(())
    } else {
        Err(invalid_field("quantity", "must be greater than zero"))
    }
}

fn build_result(resolution: ItemResolution, requested: f64, draws: Vec<BatchDraw>) -> AllocationResult {
    let allocated = draws.iter().map(|draw| draw.quantity).sum();
    AllocationResult {
        item_id: resolution.item.id,
        item_name: resolution.item.name,
        unit: resolution.item.unit,
        requested,
        allocated,
        draws,
        alternatives: resolution.alternatives,
    }
}

/// Greedy FIFO over `batches`, which must already be sorted oldest first.
/// Mutates the batches in place and returns one draw per batch touched.
fn draw_fifo(batches: &mut [StockBatch], quantity: f64) -> Vec<BatchDraw> {
    let mut remaining = quantity;
    let mut draws = Vec::new();
    for batch in batches.iter_mut() {
        if is_depleted(remaining) {
            break;
        }
        if !batch.is_active() || is_depleted(batch.remaining_quantity) {
            continue;
        }
        let take = remaining.min(batch.remaining_quantity);
        remaining -= take;
        batch.remaining_quantity -= take;
        if is_depleted(batch.remaining_quantity) {
            batch.remaining_quantity = 0.0;
            batch.status = StockBatchStatus::Consumed;
        }
        draws.push(BatchDraw {
            batch_id: batch.id,
            purchase_date: batch.purchase_date,
            quantity: take,
            remaining_after: batch.remaining_quantity,
            consumed: batch.status == StockBatchStatus::Consumed,
        });
    }
    draws
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::FixedClock;
    use crate::domain::InventoryItem;
    use crate::storage::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 1, 14, 6, 0, 0).unwrap())
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    /// Rice with three 5 kg batches bought on the 1st, 2nd and 3rd, inserted out of order.
    fn stocked_store() -> (MemoryStore, Uuid, Vec<Uuid>) {
        let mut store = MemoryStore::new();
        let rice = InventoryItem::new("Rice", "kg");
        let rice_id = InventoryService::add_item(&mut store, rice).unwrap();
        let mut ids = vec![Uuid::nil(); 3];
        for day in [3, 1, 2] {
            let batch =
                InventoryService::receive_stock(&mut store, &clock(), rice_id, date(day), 5.0, None)
                    .unwrap();
            ids[(day - 1) as usize] = batch.id;
        }
        (store, rice_id, ids)
    }

    #[test]
    fn draws_oldest_batch_first() {
        let (mut store, _rice, ids) = stocked_store();
        let result =
            FifoAllocator::allocate(&mut store, &clock(), "rice", 7.0, "Pongal plan").unwrap();

        assert_eq!(result.allocated, 7.0);
        assert_eq!(result.draws.len(), 2);

        let first: StockBatch = store.get(ids[0]).unwrap().unwrap();
        let second: StockBatch = store.get(ids[1]).unwrap().unwrap();
        let third: StockBatch = store.get(ids[2]).unwrap().unwrap();
        assert_eq!(first.remaining_quantity, 0.0);
        assert_eq!(first.status, StockBatchStatus::Consumed);
        assert_eq!(second.remaining_quantity, 3.0);
        assert_eq!(second.status, StockBatchStatus::Active);
        assert_eq!(third.remaining_quantity, 5.0);
    }

    #[test]
    fn shortfall_commits_what_was_available() {
        let (mut store, rice, _ids) = stocked_store();
        let err = FifoAllocator::allocate(&mut store, &clock(), "Rice", 20.0, "Annadan")
            .expect_err("only 15 kg on hand");
        match err {
            ServiceError::InsufficientStock {
                allocated,
                shortfall,
                ..
            } => {
                assert_eq!(allocated, 15.0);
                assert_eq!(shortfall, 5.0);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(InventoryService::current_stock(&store, rice).unwrap(), 0.0);
    }

    #[test]
    fn each_batch_touched_gets_an_issue_movement() {
        let (mut store, rice, _ids) = stocked_store();
        FifoAllocator::allocate(&mut store, &clock(), "Rice", 12.0, "Festival").unwrap();
        let issues: Vec<StockMovement> = InventoryService::movements_for_item(&store, rice)
            .unwrap()
            .into_iter()
            .filter(|movement| movement.movement_type == MovementType::Issue)
            .collect();
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|movement| movement.reason == "Festival"));
        let issued: f64 = issues.iter().map(|movement| movement.quantity).sum();
        assert_eq!(issued, 12.0);
    }

    #[test]
    fn preview_leaves_store_untouched() {
        let (store, rice, _ids) = stocked_store();
        let preview = FifoAllocator::preview(&store, "Rice", 18.0).unwrap();
        assert_eq!(preview.allocated, 15.0);
        assert_eq!(preview.shortfall(), 3.0);
        assert_eq!(InventoryService::current_stock(&store, rice).unwrap(), 15.0);
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let (mut store, _rice, _ids) = stocked_store();
        for quantity in [0.0, -2.0] {
            let err = FifoAllocator::allocate(&mut store, &clock(), "Rice", quantity, "x")
                .unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
    }

    #[test]
    fn unknown_item_fails_before_touching_stock() {
        let (mut store, rice, _ids) = stocked_store();
        let err = FifoAllocator::allocate(&mut store, &clock(), "Saffron", 1.0, "x").unwrap_err();
        assert!(matches!(err, ServiceError::ItemNotFound { .. }));
        assert_eq!(InventoryService::current_stock(&store, rice).unwrap(), 15.0);
    }
}
