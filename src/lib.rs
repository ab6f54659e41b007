#![doc(test(attr(deny(warnings))))]

//! Prasad Ledger plans temple kitchen output, deducts ingredients from
//! inventory oldest batch first and keeps an append-only ledger of every
//! hand-out and every wasted portion.

pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod storage;
pub mod utils;

use std::sync::Once;

pub use crate::core::ledger_manager::PrasadLedger;
pub use crate::core::services::{ServiceError, ServiceResult};
pub use crate::errors::LedgerError;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Prasad ledger tracing initialized.");
    });
}
