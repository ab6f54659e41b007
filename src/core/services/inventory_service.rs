//! Raw-material inventory: item registration, stock receipts and the
//! best-effort name lookup used by the allocator.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::core::services::{invalid_field, ServiceError, ServiceResult};
use crate::core::time::Clock;
use crate::domain::{
    common::is_depleted, InventoryItem, MovementType, StockBatch, StockMovement,
};
use crate::storage::RecordStore;

const SUGGESTION_THRESHOLD: f64 = 0.75;
const MAX_SUGGESTIONS: usize = 3;

/// Outcome of resolving a free-text item name against the inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResolution {
    pub item: InventoryItem,
    /// `true` when the name matched case-insensitively in full.
    pub exact: bool,
    /// Other items the query also matched. Non-empty means the pick was ambiguous.
    pub alternatives: Vec<String>,
}

impl ItemResolution {
    pub fn is_ambiguous(&self) -> bool {
        !self.alternatives.is_empty()
    }
}

pub struct InventoryService;

impl InventoryService {
    /// Registers a new inventory item. Names are unique ignoring case.
    pub fn add_item<S: RecordStore>(store: &mut S, item: InventoryItem) -> ServiceResult<Uuid> {
        let normalized = item.name.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(invalid_field("name", "must not be empty"));
        }
        if item.unit.trim().is_empty() {
            return Err(invalid_field("unit", "must not be empty"));
        }
        let duplicate = store
            .get_all::<InventoryItem>()?
            .iter()
            .any(|existing| existing.name.trim().to_lowercase() == normalized);
        if duplicate {
            return Err(ServiceError::Invalid(format!(
                "Inventory item `{}` already exists",
                item.name
            )));
        }
        store.put(&item)?;
        Ok(item.id)
    }

    pub fn item<S: RecordStore>(store: &S, id: Uuid) -> ServiceResult<InventoryItem> {
        store
            .get::<InventoryItem>(id)?
            .ok_or_else(|| ServiceError::not_found("inventory item", id))
    }

    /// Records a purchase as a new active batch plus a `receipt` movement.
    pub fn receive_stock<S: RecordStore>(
        store: &mut S,
        clock: &dyn Clock,
        item_id: Uuid,
        purchase_date: NaiveDate,
        quantity: f64,
        expiry_date: Option<NaiveDate>,
    ) -> ServiceResult<StockBatch> {
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(invalid_field("quantity", "must be greater than zero"));
        }
        if let Some(expiry) = expiry_date {
            if expiry < purchase_date {
                return Err(invalid_field("expiry_date", "must not precede purchase date"));
            }
        }
        let item = Self::item(store, item_id)?;
        let mut batch = StockBatch::new(item.id, purchase_date, quantity);
        if let Some(expiry) = expiry_date {
            batch = batch.with_expiry(expiry);
        }
        let movement = StockMovement {
            id: Uuid::new_v4(),
            item_id: item.id,
            batch_id: batch.id,
            movement_type: MovementType::Receipt,
            quantity,
            reason: "stock receipt".into(),
            created_at: clock.now(),
        };
        store.put(&batch)?;
        store.put(&movement)?;
        tracing::info!(item = %item.name, quantity, %purchase_date, "stock received");
        Ok(batch)
    }

    /// Active batches of an item, oldest purchase first.
    pub fn active_batches<S: RecordStore>(store: &S, item_id: Uuid) -> ServiceResult<Vec<StockBatch>> {
        let mut batches: Vec<StockBatch> = store
            .get_all::<StockBatch>()?
            .into_iter()
            .filter(|batch| batch.item_id == item_id && batch.is_active())
            .collect();
        batches.sort_by_key(|batch| batch.purchase_date);
        Ok(batches)
    }

    /// Stock on hand, derived from the remaining quantity of active batches.
    pub fn current_stock<S: RecordStore>(store: &S, item_id: Uuid) -> ServiceResult<f64> {
        let total: f64 = Self::active_batches(store, item_id)?
            .iter()
            .map(|batch| batch.remaining_quantity)
            .sum();
        Ok(if is_depleted(total) { 0.0 } else { total })
    }

    pub fn movements_for_item<S: RecordStore>(
        store: &S,
        item_id: Uuid,
    ) -> ServiceResult<Vec<StockMovement>> {
        let mut movements: Vec<StockMovement> = store
            .get_all::<StockMovement>()?
            .into_iter()
            .filter(|movement| movement.item_id == item_id)
            .collect();
        movements.sort_by_key(|movement| movement.created_at);
        Ok(movements)
    }

    /// Resolves `query` to an inventory item.
    ///
    /// A case-insensitive full-name match wins. Otherwise the first item (by
    /// name) whose name contains the query, or is contained in it, is picked;
    /// every other candidate is reported in [`ItemResolution::alternatives`].
    pub fn resolve<S: RecordStore>(store: &S, query: &str) -> ServiceResult<ItemResolution> {
        let mut items = store.get_all::<InventoryItem>()?;
        items.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        resolve_in(items, query)
    }
}

fn resolve_in(items: Vec<InventoryItem>, query: &str) -> ServiceResult<ItemResolution> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(invalid_field("item_name", "must not be empty"));
    }

    let (exact, rest): (Vec<_>, Vec<_>) = items
        .into_iter()
        .partition(|item| item.name.trim().to_lowercase() == needle);
    let mut candidates = if exact.is_empty() {
        rest.iter()
            .filter(|item| {
                let name = item.name.trim().to_lowercase();
                !name.is_empty() && (name.contains(&needle) || needle.contains(&name))
            })
            .cloned()
            .collect::<Vec<_>>()
    } else {
        exact.clone()
    };

    if candidates.is_empty() {
        let mut scored: Vec<(f64, String)> = rest
            .iter()
            .map(|item| {
                let score = strsim::jaro_winkler(&needle, &item.name.to_lowercase());
                (score, item.name.clone())
            })
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        return Err(ServiceError::ItemNotFound {
            query: query.to_string(),
            suggestions: scored
                .into_iter()
                .take(MAX_SUGGESTIONS)
                .map(|(_, name)| name)
                .collect(),
        });
    }

    let item = candidates.remove(0);
    let alternatives: Vec<String> = candidates.into_iter().map(|other| other.name).collect();
    if !alternatives.is_empty() {
        tracing::warn!(
            query,
            chosen = %item.name,
            ?alternatives,
            "inventory lookup matched several items"
        );
    }
    Ok(ItemResolution {
        item,
        exact: !exact.is_empty(),
        alternatives,
    })
}
