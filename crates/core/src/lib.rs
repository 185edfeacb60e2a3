//! `stockbook-core` — identifiers, the domain error model and the few value
//! types shared by every stockbook crate.
//!
//! Nothing in here performs IO.

pub mod error;
pub mod id;
pub mod payment;

pub use error::DomainError;
pub use id::{CustomerId, EntryId, ProductId, PurchaseId, SaleId, SupplierId, UserId};
pub use payment::PaymentMethod;
