//! Ledger store boundary.
//!
//! A store owns stock records and ledger entries and is the only place a
//! decided change is made durable. Every mutation goes through `transact`,
//! which locks the affected products, runs the pure decision logic and writes
//! the result in one unit of work.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;
mod unit_of_work;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use r#trait::{HistoryPage, LedgerStore, StockOutcome};
