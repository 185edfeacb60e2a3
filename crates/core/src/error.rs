//! Domain error model.

use thiserror::Error;

use crate::id::ProductId;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, stock availability). Storage concerns belong to the infra crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. non-positive quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated (e.g. receiving a purchase twice).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The thing being created already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// An issue asked for more units than the product has on hand.
    #[error("insufficient stock for product {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: ProductId,
        available: i64,
        requested: i64,
    },

    /// A requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The product still has ledger history and cannot be removed.
    #[error("product {product} has {entries} ledger entries and cannot be removed")]
    HistoryRetained { product: ProductId, entries: u64 },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn insufficient_stock(product: ProductId, available: i64, requested: i64) -> Self {
        Self::InsufficientStock {
            product,
            available,
            requested,
        }
    }

    /// Units missing to satisfy an issue; zero for every other error.
    pub fn shortfall(&self) -> i64 {
        match self {
            Self::InsufficientStock {
                available,
                requested,
                ..
            } => (requested - available).max(0),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortfall_is_requested_minus_available() {
        let err = DomainError::insufficient_stock(ProductId::new(), 2, 5);
        assert_eq!(err.shortfall(), 3);
        assert!(err.to_string().contains("available 2, requested 5"));
    }

    #[test]
    fn shortfall_is_zero_for_other_errors() {
        assert_eq!(DomainError::validation("x").shortfall(), 0);
    }
}
