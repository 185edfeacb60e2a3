use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use stockbook_core::{PurchaseId, SaleId};
use stockbook_infra::{
    AppConfig, Fulfillment, InMemoryLedgerStore, InventoryLedger, LedgerError, LedgerStore,
    PostgresLedgerStore, Procurement, StoreKind,
};
use stockbook_purchasing::Purchase;
use stockbook_sales::Sale;

/// Store handle shared by every service; the backend is chosen at startup.
pub type SharedStore = Arc<dyn LedgerStore>;

/// A document guarded by its own lock.
pub type Shared<T> = Arc<Mutex<T>>;

/// In-process keeper of purchase and sale documents.
///
/// The maps are locked only to look a document up. Each document has its own
/// lock, held for the whole workflow call that changes it, so two receipts
/// (or two cancellations) of the same document cannot interleave while
/// different documents proceed independently.
#[derive(Debug, Default)]
pub struct DocumentBook {
    purchases: Mutex<HashMap<PurchaseId, Shared<Purchase>>>,
    sales: Mutex<HashMap<SaleId, Shared<Sale>>>,
}

impl DocumentBook {
    pub async fn insert_purchase(&self, purchase: Purchase) {
        self.purchases
            .lock()
            .await
            .insert(purchase.id(), Arc::new(Mutex::new(purchase)));
    }

    pub async fn purchase(&self, id: PurchaseId) -> Option<Shared<Purchase>> {
        self.purchases.lock().await.get(&id).cloned()
    }

    pub async fn insert_sale(&self, sale: Sale) {
        self.sales
            .lock()
            .await
            .insert(sale.id(), Arc::new(Mutex::new(sale)));
    }

    pub async fn sale(&self, id: SaleId) -> Option<Shared<Sale>> {
        self.sales.lock().await.get(&id).cloned()
    }
}

pub struct AppServices {
    ledger: Arc<InventoryLedger<SharedStore>>,
    procurement: Procurement<SharedStore>,
    fulfillment: Fulfillment<SharedStore>,
    documents: DocumentBook,
}

impl AppServices {
    pub fn new(store: SharedStore, history_page_size: usize) -> Self {
        let ledger = Arc::new(InventoryLedger::new(store).with_page_size(history_page_size));
        Self {
            procurement: Procurement::new(ledger.clone()),
            fulfillment: Fulfillment::new(ledger.clone()),
            ledger,
            documents: DocumentBook::default(),
        }
    }

    /// Services over a fresh in-memory store (dev and tests).
    pub fn in_memory(history_page_size: usize) -> Self {
        Self::new(Arc::new(InMemoryLedgerStore::new()), history_page_size)
    }

    /// Services over the store selected by configuration.
    ///
    /// For Postgres this connects and applies the ledger schema.
    pub async fn from_config(config: &AppConfig) -> Result<Self, LedgerError> {
        let store: SharedStore = match config.store {
            StoreKind::Memory => Arc::new(InMemoryLedgerStore::new()),
            StoreKind::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or_else(|| LedgerError::storage("database_url is not configured"))?;
                let store = PostgresLedgerStore::connect(url, config.db_max_connections).await?;
                store.migrate().await?;
                Arc::new(store)
            }
        };
        info!(store = ?config.store, "ledger store ready");
        Ok(Self::new(store, config.history_page_size))
    }

    pub fn ledger(&self) -> &InventoryLedger<SharedStore> {
        &self.ledger
    }

    pub fn procurement(&self) -> &Procurement<SharedStore> {
        &self.procurement
    }

    pub fn fulfillment(&self) -> &Fulfillment<SharedStore> {
        &self.fulfillment
    }

    pub fn documents(&self) -> &DocumentBook {
        &self.documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn test_sale(invoice: &str) -> Sale {
        Sale::new(
            SaleId::new(),
            invoice,
            None,
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn a_locked_document_does_not_block_others() {
        let book = DocumentBook::default();
        let first = test_sale("INV-1");
        let second = test_sale("INV-2");
        let (first_id, second_id) = (first.id(), second.id());
        book.insert_sale(first).await;
        book.insert_sale(second).await;

        let first = book.sale(first_id).await.unwrap();
        let _held = first.lock().await;

        let again = book.sale(first_id).await.unwrap();
        assert!(again.try_lock().is_err());

        let second = book.sale(second_id).await.unwrap();
        assert!(second.try_lock().is_ok());
    }

    #[tokio::test]
    async fn unknown_document_is_none() {
        let book = DocumentBook::default();
        assert!(book.purchase(PurchaseId::new()).await.is_none());
        assert!(book.sale(SaleId::new()).await.is_none());
    }
}
