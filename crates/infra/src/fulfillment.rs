//! Sale completion and cancellation workflows.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use stockbook_core::UserId;
use stockbook_inventory::StockCommand;
use stockbook_sales::Sale;

use crate::error::LedgerError;
use crate::ledger::InventoryLedger;
use crate::store::{LedgerStore, StockOutcome};

/// Issues stock for sales and restores it on cancellation.
#[derive(Debug)]
pub struct Fulfillment<S> {
    ledger: Arc<InventoryLedger<S>>,
}

impl<S> Clone for Fulfillment<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
        }
    }
}

impl<S: LedgerStore> Fulfillment<S> {
    pub fn new(ledger: Arc<InventoryLedger<S>>) -> Self {
        Self { ledger }
    }

    /// Issue every line of a draft sale in one unit of work, then mark it
    /// completed.
    ///
    /// All-or-nothing: if any line is short the whole sale is rejected with
    /// `InsufficientStock` for that line, nothing is committed and the sale
    /// stays draft.
    #[instrument(
        skip(self, sale),
        fields(sale_id = %sale.id(), invoice = sale.invoice_number(), actor = %actor),
        err
    )]
    pub async fn complete_sale(
        &self,
        sale: &mut Sale,
        actor: UserId,
    ) -> Result<Vec<StockOutcome>, LedgerError> {
        sale.ensure_completable()?;

        let commands = sale
            .lines()
            .iter()
            .map(|line| StockCommand::issue(line.product_id, line.quantity, sale.id(), actor))
            .collect();
        let outcomes = self.ledger.apply_batch(commands).await?;

        sale.mark_completed(Utc::now())?;
        info!(lines = outcomes.len(), total = sale.total_amount(), "sale completed");
        Ok(outcomes)
    }

    /// Restore the original quantity of every line of a completed sale,
    /// regardless of current stock, then mark it cancelled.
    #[instrument(
        skip(self, sale),
        fields(sale_id = %sale.id(), invoice = sale.invoice_number(), actor = %actor),
        err
    )]
    pub async fn cancel_sale(
        &self,
        sale: &mut Sale,
        actor: UserId,
    ) -> Result<Vec<StockOutcome>, LedgerError> {
        sale.ensure_cancellable()?;

        let commands = sale
            .lines()
            .iter()
            .map(|line| StockCommand::restore(line.product_id, line.quantity, sale.id(), actor))
            .collect();
        let outcomes = self.ledger.apply_batch(commands).await?;

        sale.mark_cancelled(Utc::now())?;
        info!(lines = outcomes.len(), "sale cancelled");
        Ok(outcomes)
    }
}
