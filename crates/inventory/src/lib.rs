//! Inventory ledger domain module.
//!
//! This crate contains the business rules for stock quantities and their audit
//! trail, implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). Stores call [`StockLevel::handle`] while holding whatever lock
//! they use to serialise writers, then persist the returned [`StockChange`].

pub mod entry;
pub mod report;
pub mod stock;

pub use entry::{LedgerEntry, Reference, ReferenceType, TransactionType};
pub use report::{CatalogItem, StatusFilter, StockLine, StockReport, StockStatus};
pub use stock::{
    INITIAL_STOCK_NOTE, StockChange, StockCommand, StockLevel, StockMovement, StockRecord,
};
