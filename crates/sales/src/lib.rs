//! Sales domain module.
//!
//! Point-of-sale documents and their status lifecycle, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Stock is issued
//! and restored through the inventory ledger, not here.

pub mod sale;

pub use sale::{Sale, SaleLine, SaleStatus};
