pub mod allocator;
pub mod distribution_service;
pub mod inventory_service;
pub mod plan_service;
pub mod seva_service;
pub mod summary_service;
pub mod wastage_service;

use std::fmt;

use uuid::Uuid;

pub use allocator::{AllocationResult, BatchDraw, FifoAllocator};
pub use distribution_service::{DistributionEntry, DistributionService};
pub use inventory_service::{InventoryService, ItemResolution};
pub use plan_service::{
    PlanDraft, PlanPatch, PlanService, PreparationReport, ShortageKind, ShortagePolicy,
    StockShortfall,
};
pub use seva_service::SevaCalculator;
pub use summary_service::{CategoryTotals, PlanSummary, SummaryService};
pub use wastage_service::{WastageEntry, WastageService};

use crate::{
    domain::{DistributionPoint, PlanStatus, PrasadCategory},
    errors::LedgerError,
};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("category {category} cannot be distributed at {point}")]
    IncompatibleCategoryPoint {
        category: PrasadCategory,
        point: DistributionPoint,
    },
    #[error("plan {plan_id} is locked to {current}; cannot change to {requested}")]
    CategoryLocked {
        plan_id: Uuid,
        current: PrasadCategory,
        requested: PrasadCategory,
    },
    #[error("plan {plan_id} cannot be changed: {reason}")]
    ImmutablePlan { plan_id: Uuid, reason: String },
    #[error("no inventory item matches `{query}`")]
    ItemNotFound {
        query: String,
        suggestions: Vec<String>,
    },
    #[error(
        "insufficient stock of {item}: requested {requested}, allocated {allocated}, short by {shortfall}"
    )]
    InsufficientStock {
        item: String,
        requested: f64,
        allocated: f64,
        shortfall: f64,
    },
    #[error("{} seva cannot be linked to a {category} plan", seva_kind(.seva_is_free))]
    IncompatibleSeva {
        category: PrasadCategory,
        seva_is_free: bool,
    },
    #[error(
        "seva {seva_id} would be over-distributed: expected {expected}, already distributed {distributed}, requested {requested}"
    )]
    Overdistribution {
        seva_id: String,
        expected: f64,
        distributed: f64,
        requested: f64,
    },
    #[error("batch {batch_number} has only {available} available, requested {requested}")]
    InsufficientBatch {
        batch_id: Uuid,
        batch_number: String,
        available: f64,
        requested: f64,
    },
    #[error("plan {plan_id} cannot move from {from} to {to}")]
    InvalidTransition {
        plan_id: Uuid,
        from: PlanStatus,
        to: PlanStatus,
    },
    #[error("plan {plan_id} is short of stock for {} item(s)", .shortfalls.len())]
    StockShortage {
        plan_id: Uuid,
        shortfalls: Vec<StockShortfall>,
    },
    #[error("{0}")]
    Invalid(String),
}

fn seva_kind(is_free: &bool) -> &'static str {
    if *is_free {
        "free"
    } else {
        "paid"
    }
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field problem found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }

    pub fn into_result(self) -> ServiceResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

/// Shorthand for a single-field validation failure.
pub(crate) fn invalid_field(field: &str, message: &str) -> ServiceError {
    let mut errors = ValidationErrors::new();
    errors.push(field, message);
    ServiceError::Validation(errors)
}
