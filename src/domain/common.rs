use uuid::Uuid;

/// Tolerance used when comparing fractional quantities (kilograms, litres).
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// Identifies entities that expose a stable unique identifier.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Provides access to a human-friendly entity name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Returns `true` when `lhs <= rhs` once floating point noise is ignored.
pub fn quantity_le(lhs: f64, rhs: f64) -> bool {
    lhs <= rhs + QUANTITY_EPSILON
}

/// Returns `true` when a remaining quantity should be treated as zero.
pub fn is_depleted(quantity: f64) -> bool {
    quantity.abs() <= QUANTITY_EPSILON
}

// Re-export common dependencies so consumers can rely on this module as a façade.
pub use chrono;
pub use serde;
pub use uuid;
