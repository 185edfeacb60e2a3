use std::sync::Arc;

use async_trait::async_trait;

use stockbook_core::ProductId;
use stockbook_inventory::{LedgerEntry, StockCommand, StockRecord};

use crate::error::LedgerError;

/// Result of one committed stock command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockOutcome {
    pub product_id: ProductId,
    /// Record after the command; `None` only when a no-op left the product
    /// without a record (adjusting an unknown product to zero).
    pub record: Option<StockRecord>,
    /// Entry appended by the command; `None` for no-ops and zero initialisation.
    pub entry: Option<LedgerEntry>,
}

impl StockOutcome {
    pub fn quantity(&self) -> i64 {
        self.record.as_ref().map(|r| r.quantity).unwrap_or(0)
    }
}

/// Keyset page over a product's history, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPage {
    /// Only entries with `sequence < before`; `None` starts at the newest.
    pub before: Option<u64>,
    pub limit: usize,
}

impl HistoryPage {
    pub fn first(limit: usize) -> Self {
        Self {
            before: None,
            limit,
        }
    }

    pub fn before(sequence: u64, limit: usize) -> Self {
        Self {
            before: Some(sequence),
            limit,
        }
    }
}

/// Persistence boundary for stock records and their ledger.
///
/// Implementations must:
/// - run every `transact` call as one isolated unit of work: either all
///   commands commit or none do
/// - decide each command against the state left by the previous commands of
///   the same call (commands on the same product chain)
/// - never update or delete a ledger entry
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Lock, decide, write and append for a batch of commands.
    ///
    /// Outcomes are returned in command order.
    async fn transact(&self, commands: Vec<StockCommand>) -> Result<Vec<StockOutcome>, LedgerError>;

    async fn get(&self, product: ProductId) -> Result<Option<StockRecord>, LedgerError>;

    /// Entries for one product, ordered by `sequence` descending.
    async fn list_by_product(
        &self,
        product: ProductId,
        page: HistoryPage,
    ) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Delete the stock record of a product without history.
    ///
    /// Fails with `DomainError::HistoryRetained` when entries exist. Returns
    /// whether a record was deleted.
    async fn remove(&self, product: ProductId) -> Result<bool, LedgerError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn transact(&self, commands: Vec<StockCommand>) -> Result<Vec<StockOutcome>, LedgerError> {
        (**self).transact(commands).await
    }

    async fn get(&self, product: ProductId) -> Result<Option<StockRecord>, LedgerError> {
        (**self).get(product).await
    }

    async fn list_by_product(
        &self,
        product: ProductId,
        page: HistoryPage,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        (**self).list_by_product(product, page).await
    }

    async fn remove(&self, product: ProductId) -> Result<bool, LedgerError> {
        (**self).remove(product).await
    }
}
