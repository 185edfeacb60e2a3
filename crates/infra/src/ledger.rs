//! Inventory ledger service.
//!
//! The single path through which stock quantity changes. Each operation is
//! one unit of work against the configured `LedgerStore` and is attributed to
//! an explicit acting user.

use tracing::{info, instrument, warn};

use stockbook_core::{DomainError, ProductId, PurchaseId, SaleId, UserId};
use stockbook_inventory::{LedgerEntry, StockCommand, StockRecord};

use crate::error::LedgerError;
use crate::store::{HistoryPage, LedgerStore, StockOutcome};

/// Page size used when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Per-product stock quantity plus its append-only history.
#[derive(Debug)]
pub struct InventoryLedger<S> {
    store: S,
    page_size: usize,
}

impl<S: LedgerStore> InventoryLedger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// History page size; zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Create the stock record with an opening quantity.
    #[instrument(skip(self), fields(product_id = %product, actor = %actor), err)]
    pub async fn initialize(
        &self,
        product: ProductId,
        quantity: i64,
        actor: UserId,
    ) -> Result<StockRecord, LedgerError> {
        let outcome = self
            .run(StockCommand::initialize(product, quantity, actor))
            .await?;
        let record = outcome
            .record
            .ok_or_else(|| LedgerError::storage("initialize committed without a record"))?;
        info!(quantity = record.quantity, "stock initialized");
        Ok(record)
    }

    /// Increase stock for a purchase receipt.
    #[instrument(skip(self), fields(product_id = %product, purchase_id = %purchase_id), err)]
    pub async fn receive(
        &self,
        product: ProductId,
        quantity: i64,
        purchase_id: PurchaseId,
        actor: UserId,
    ) -> Result<StockOutcome, LedgerError> {
        self.run(StockCommand::receive(product, quantity, purchase_id, actor))
            .await
    }

    /// Decrease stock for a sale; fails with `InsufficientStock` and leaves
    /// everything unchanged when fewer than `quantity` units are on hand.
    #[instrument(skip(self), fields(product_id = %product, sale_id = %sale_id), err)]
    pub async fn issue(
        &self,
        product: ProductId,
        quantity: i64,
        sale_id: SaleId,
        actor: UserId,
    ) -> Result<StockOutcome, LedgerError> {
        self.run(StockCommand::issue(product, quantity, sale_id, actor))
            .await
    }

    /// Put back stock from a cancelled sale.
    #[instrument(skip(self), fields(product_id = %product, sale_id = %sale_id), err)]
    pub async fn restore(
        &self,
        product: ProductId,
        quantity: i64,
        sale_id: SaleId,
        actor: UserId,
    ) -> Result<StockOutcome, LedgerError> {
        self.run(StockCommand::restore(product, quantity, sale_id, actor))
            .await
    }

    /// Set stock to an operator-supplied value. Adjusting to the current
    /// value appends nothing.
    #[instrument(skip(self, notes), fields(product_id = %product, actor = %actor), err)]
    pub async fn adjust(
        &self,
        product: ProductId,
        new_quantity: i64,
        actor: UserId,
        notes: Option<String>,
    ) -> Result<StockOutcome, LedgerError> {
        self.run(StockCommand::adjust(product, new_quantity, actor, notes))
            .await
    }

    /// Apply several commands, possibly across products, as one unit of work.
    #[instrument(skip(self, commands), fields(command_count = commands.len()), err)]
    pub async fn apply_batch(
        &self,
        commands: Vec<StockCommand>,
    ) -> Result<Vec<StockOutcome>, LedgerError> {
        let outcomes = self.store.transact(commands).await.inspect_err(log_rejection)?;
        for outcome in &outcomes {
            log_outcome(outcome);
        }
        Ok(outcomes)
    }

    /// Lazy, restartable view of a product's history, newest first.
    pub fn history(&self, product: ProductId) -> History<'_, S> {
        History {
            store: &self.store,
            product,
            page_size: self.page_size,
            cursor: None,
            exhausted: false,
        }
    }

    /// One explicit keyset page, for callers that carry the cursor themselves.
    pub async fn history_page(
        &self,
        product: ProductId,
        page: HistoryPage,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.store.list_by_product(product, page).await
    }

    /// Quantity on hand; 0 when the product has no record.
    ///
    /// Never fails: a storage error is logged and reported as 0.
    pub async fn current_quantity(&self, product: ProductId) -> i64 {
        match self.store.get(product).await {
            Ok(record) => record.map(|r| r.quantity).unwrap_or(0),
            Err(err) => {
                warn!(product_id = %product, error = %err, "reading stock failed; reporting 0");
                0
            }
        }
    }

    pub async fn stock(&self, product: ProductId) -> Result<Option<StockRecord>, LedgerError> {
        self.store.get(product).await
    }

    /// Product-deletion hook: drops the stock record, refused while history exists.
    #[instrument(skip(self), fields(product_id = %product), err)]
    pub async fn remove_product(&self, product: ProductId) -> Result<bool, LedgerError> {
        let removed = self.store.remove(product).await?;
        if removed {
            info!("stock record removed");
        }
        Ok(removed)
    }

    async fn run(&self, cmd: StockCommand) -> Result<StockOutcome, LedgerError> {
        let outcome = self
            .store
            .transact(vec![cmd])
            .await
            .inspect_err(log_rejection)?
            .pop()
            .ok_or_else(|| LedgerError::storage("store returned no outcome"))?;
        log_outcome(&outcome);
        Ok(outcome)
    }
}

fn log_outcome(outcome: &StockOutcome) {
    match &outcome.entry {
        Some(entry) => info!(
            product_id = %entry.product_id,
            transaction_type = entry.transaction_type.as_str(),
            quantity_before = entry.quantity_before,
            quantity_after = entry.quantity_after,
            sequence = entry.sequence,
            "stock changed"
        ),
        None => info!(
            product_id = %outcome.product_id,
            quantity = outcome.quantity(),
            "stock unchanged"
        ),
    }
}

fn log_rejection(err: &LedgerError) {
    if let LedgerError::Domain(DomainError::InsufficientStock {
        product,
        available,
        requested,
    }) = err
    {
        warn!(
            product_id = %product,
            available,
            requested,
            "issue rejected: insufficient stock"
        );
    }
}

/// Cursor over one product's ledger entries, most recent first.
///
/// Pages are fetched lazily with a keyset on `sequence`, so entries appended
/// while iterating never shift later pages.
#[derive(Debug)]
pub struct History<'a, S> {
    store: &'a S,
    product: ProductId,
    page_size: usize,
    cursor: Option<u64>,
    exhausted: bool,
}

impl<S: LedgerStore> History<'_, S> {
    /// Next page of entries; `None` once the oldest entry has been returned.
    pub async fn next_page(&mut self) -> Result<Option<Vec<LedgerEntry>>, LedgerError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = HistoryPage {
            before: self.cursor,
            limit: self.page_size,
        };
        let entries = self.store.list_by_product(self.product, page).await?;

        match entries.last() {
            Some(oldest) => {
                self.cursor = Some(oldest.sequence);
                if entries.len() < self.page_size || oldest.sequence <= 1 {
                    self.exhausted = true;
                }
                Ok(Some(entries))
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    /// Start again from the newest entry.
    pub fn restart(&mut self) {
        self.cursor = None;
        self.exhausted = false;
    }

    /// Drain the remaining pages into one vector.
    pub async fn collect_all(&mut self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }
}
