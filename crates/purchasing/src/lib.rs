//! Purchasing domain module.
//!
//! Purchase documents and their status lifecycle, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Stock is not
//! touched here: receipt goes through the inventory ledger.

pub mod purchase;

pub use purchase::{Purchase, PurchaseLine, PurchaseStatus};
