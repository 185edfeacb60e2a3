//! Infrastructure layer: ledger storage, the ledger service and the
//! workflows built on it, configuration.

pub mod config;
pub mod error;
pub mod fulfillment;
pub mod ledger;
pub mod procurement;
pub mod reporting;
pub mod store;

pub use config::{AppConfig, AppConfigError, StoreKind};
pub use error::LedgerError;
pub use fulfillment::Fulfillment;
pub use ledger::{History, InventoryLedger};
pub use procurement::Procurement;
pub use reporting::stock_report;
pub use store::{
    HistoryPage, InMemoryLedgerStore, LedgerStore, PostgresLedgerStore, StockOutcome,
};
