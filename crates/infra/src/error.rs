use thiserror::Error;

use stockbook_core::DomainError;

/// Error returned by ledger stores and the services built on them.
///
/// Domain rejections pass through unchanged; everything else is an
/// infrastructure failure the caller may or may not retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A concurrent writer won the race (unique violation, serialization
    /// failure, deadlock). Nothing was committed; retrying is safe.
    #[error("conflicting concurrent update: {0}")]
    ConflictRetryable(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConflictRetryable(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConflictRetryable(_))
    }

    /// The domain error, if this is a domain rejection.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            LedgerError::Domain(err) => Some(err),
            _ => None,
        }
    }
}
