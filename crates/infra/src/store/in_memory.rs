use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use stockbook_core::{DomainError, ProductId};
use stockbook_inventory::{LedgerEntry, StockCommand, StockRecord};

use super::r#trait::{HistoryPage, LedgerStore, StockOutcome};
use super::unit_of_work::{UnitOfWork, lock_order};
use crate::error::LedgerError;

#[derive(Debug, Default)]
struct LedgerState {
    records: HashMap<ProductId, StockRecord>,
    /// Per-product entries in append (sequence) order.
    entries: HashMap<ProductId, Vec<LedgerEntry>>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. One write guard spans the whole decide-and-persist
/// step of `transact`, so concurrent mutations serialise.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<LedgerState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all products.
    pub fn entry_count(&self) -> Result<usize, LedgerError> {
        let state = self
            .state
            .read()
            .map_err(|_| LedgerError::storage("lock poisoned"))?;
        Ok(state.entries.values().map(Vec::len).sum())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn transact(&self, commands: Vec<StockCommand>) -> Result<Vec<StockOutcome>, LedgerError> {
        if commands.is_empty() {
            return Ok(vec![]);
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| LedgerError::storage("lock poisoned"))?;

        let mut uow = UnitOfWork::new();
        for product in lock_order(&commands) {
            uow.load(product, state.records.get(&product).cloned());
        }
        for cmd in &commands {
            uow.decide(cmd)?;
        }

        let writes = uow.into_writes();
        for (record, _) in writes.records {
            state.records.insert(record.product_id, record);
        }
        for entry in writes.entries {
            state.entries.entry(entry.product_id).or_default().push(entry);
        }

        Ok(writes.outcomes)
    }

    async fn get(&self, product: ProductId) -> Result<Option<StockRecord>, LedgerError> {
        let state = self
            .state
            .read()
            .map_err(|_| LedgerError::storage("lock poisoned"))?;
        Ok(state.records.get(&product).cloned())
    }

    async fn list_by_product(
        &self,
        product: ProductId,
        page: HistoryPage,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let state = self
            .state
            .read()
            .map_err(|_| LedgerError::storage("lock poisoned"))?;

        let Some(entries) = state.entries.get(&product) else {
            return Ok(vec![]);
        };

        Ok(entries
            .iter()
            .rev()
            .filter(|e| page.before.is_none_or(|before| e.sequence < before))
            .take(page.limit)
            .cloned()
            .collect())
    }

    async fn remove(&self, product: ProductId) -> Result<bool, LedgerError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| LedgerError::storage("lock poisoned"))?;

        let entries = state.entries.get(&product).map(Vec::len).unwrap_or(0);
        if entries > 0 {
            return Err(DomainError::HistoryRetained {
                product,
                entries: entries as u64,
            }
            .into());
        }

        Ok(state.records.remove(&product).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockbook_core::{PurchaseId, SaleId, UserId};

    #[tokio::test]
    async fn transact_persists_records_and_entries() {
        let store = InMemoryLedgerStore::new();
        let product = ProductId::new();
        let actor = UserId::new();

        let out = store
            .transact(vec![
                StockCommand::initialize(product, 5, actor),
                StockCommand::receive(product, 2, PurchaseId::new(), actor),
            ])
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[1].quantity(), 7);
        assert_eq!(store.get(product).await.unwrap().unwrap().quantity, 7);
        assert_eq!(store.entry_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn rejected_batch_leaves_no_trace() {
        let store = InMemoryLedgerStore::new();
        let a = ProductId::new();
        let b = ProductId::new();
        let actor = UserId::new();
        store
            .transact(vec![
                StockCommand::initialize(a, 5, actor),
                StockCommand::initialize(b, 1, actor),
            ])
            .await
            .unwrap();

        let sale = SaleId::new();
        let err = store
            .transact(vec![
                StockCommand::issue(a, 2, sale, actor),
                StockCommand::issue(b, 3, sale, actor),
            ])
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::Domain(DomainError::insufficient_stock(b, 1, 3)));
        assert_eq!(store.get(a).await.unwrap().unwrap().quantity, 5);
        assert_eq!(store.entry_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn history_pages_newest_first() {
        let store = InMemoryLedgerStore::new();
        let product = ProductId::new();
        let actor = UserId::new();
        store
            .transact(vec![StockCommand::initialize(product, 1, actor)])
            .await
            .unwrap();
        for q in 2..=5 {
            store
                .transact(vec![StockCommand::adjust(product, q, actor, None)])
                .await
                .unwrap();
        }

        let first = store
            .list_by_product(product, HistoryPage::first(2))
            .await
            .unwrap();
        assert_eq!(first.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![5, 4]);

        let next = store
            .list_by_product(product, HistoryPage::before(4, 10))
            .await
            .unwrap();
        assert_eq!(next.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![3, 2, 1]);

        let unknown = store
            .list_by_product(ProductId::new(), HistoryPage::first(10))
            .await
            .unwrap();
        assert!(unknown.is_empty());
    }

    #[tokio::test]
    async fn remove_is_refused_while_history_exists() {
        let store = InMemoryLedgerStore::new();
        let actor = UserId::new();
        let with_history = ProductId::new();
        let without_history = ProductId::new();
        store
            .transact(vec![
                StockCommand::initialize(with_history, 3, actor),
                StockCommand::initialize(without_history, 0, actor),
            ])
            .await
            .unwrap();

        let err = store.remove(with_history).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::Domain(DomainError::HistoryRetained {
                product: with_history,
                entries: 1,
            })
        );

        assert!(store.remove(without_history).await.unwrap());
        assert!(!store.remove(without_history).await.unwrap());
        assert!(store.get(without_history).await.unwrap().is_none());
    }
}
