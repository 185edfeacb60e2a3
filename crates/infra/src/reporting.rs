//! Stock status and valuation reports over the ledger.

use tracing::instrument;

use stockbook_inventory::{CatalogItem, StatusFilter, StockReport};

use crate::ledger::InventoryLedger;
use crate::store::LedgerStore;

/// Build a report from catalog items and their current quantities.
///
/// Read-only. Quantities come from `current_quantity`, so an unreadable
/// record counts as out of stock rather than failing the report.
#[instrument(skip(ledger, items), fields(item_count = items.len(), filter = ?filter))]
pub async fn stock_report<S: LedgerStore>(
    ledger: &InventoryLedger<S>,
    items: Vec<CatalogItem>,
    filter: StatusFilter,
) -> StockReport {
    let mut priced = Vec::with_capacity(items.len());
    for item in items {
        let quantity = ledger.current_quantity(item.product_id).await;
        priced.push((item, quantity));
    }
    StockReport::build(priced, filter)
}
