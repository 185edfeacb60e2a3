//! Purchase receipt workflow.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use stockbook_core::UserId;
use stockbook_inventory::StockCommand;
use stockbook_purchasing::Purchase;

use crate::error::LedgerError;
use crate::ledger::InventoryLedger;
use crate::store::{LedgerStore, StockOutcome};

/// Receives purchases into stock.
#[derive(Debug)]
pub struct Procurement<S> {
    ledger: Arc<InventoryLedger<S>>,
}

impl<S> Clone for Procurement<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
        }
    }
}

impl<S: LedgerStore> Procurement<S> {
    pub fn new(ledger: Arc<InventoryLedger<S>>) -> Self {
        Self { ledger }
    }

    /// Receive every line of a pending purchase in one unit of work, then
    /// mark it received.
    ///
    /// If any line is rejected nothing is applied and the purchase stays
    /// pending. A second receipt fails without touching stock.
    #[instrument(
        skip(self, purchase),
        fields(purchase_id = %purchase.id(), invoice = purchase.invoice_number(), actor = %actor),
        err
    )]
    pub async fn receive_purchase(
        &self,
        purchase: &mut Purchase,
        actor: UserId,
    ) -> Result<Vec<StockOutcome>, LedgerError> {
        purchase.ensure_receivable()?;

        let commands = purchase
            .lines()
            .iter()
            .map(|line| StockCommand::receive(line.product_id, line.quantity, purchase.id(), actor))
            .collect();
        let outcomes = self.ledger.apply_batch(commands).await?;

        purchase.mark_received(Utc::now())?;
        info!(lines = outcomes.len(), total = purchase.total_amount(), "purchase received");
        Ok(outcomes)
    }
}
