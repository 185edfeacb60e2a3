//! Stock status classification and valuation.
//!
//! Read-only: reports combine quantities read from the ledger with catalog
//! data (reorder threshold, unit cost) and never write anything back.

use serde::{Deserialize, Serialize};

use stockbook_core::ProductId;

/// Availability bucket of a product relative to its reorder threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    Low,
    Out,
}

impl StockStatus {
    /// `out` at or below zero, `low` at or below the threshold, else `in_stock`.
    pub fn classify(quantity: i64, reorder_threshold: i64) -> Self {
        if quantity <= 0 {
            StockStatus::Out
        } else if quantity <= reorder_threshold {
            StockStatus::Low
        } else {
            StockStatus::InStock
        }
    }

    pub fn needs_reorder(&self) -> bool {
        !matches!(self, StockStatus::InStock)
    }
}

/// Which lines a report keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Low,
    Out,
}

impl StatusFilter {
    pub fn matches(&self, status: StockStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Low => status == StockStatus::Low,
            StatusFilter::Out => status == StockStatus::Out,
        }
    }
}

/// Catalog data a report needs about one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub product_id: ProductId,
    pub name: String,
    pub reorder_threshold: i64,
    /// Cost in smallest currency unit (e.g., cents).
    pub unit_cost: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub reorder_threshold: i64,
    pub status: StockStatus,
    pub unit_cost: u64,
    /// quantity × unit_cost (0 for non-positive quantities).
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockReport {
    pub lines: Vec<StockLine>,
    pub total_quantity: i64,
    pub total_value: u64,
}

impl StockReport {
    /// Build a report from catalog items paired with their current quantity.
    pub fn build(items: impl IntoIterator<Item = (CatalogItem, i64)>, filter: StatusFilter) -> Self {
        let mut report = StockReport::default();

        for (item, quantity) in items {
            let status = StockStatus::classify(quantity, item.reorder_threshold);
            if !filter.matches(status) {
                continue;
            }

            let value = if quantity > 0 {
                (quantity as u64).saturating_mul(item.unit_cost)
            } else {
                0
            };

            report.total_quantity = report.total_quantity.saturating_add(quantity.max(0));
            report.total_value = report.total_value.saturating_add(value);
            report.lines.push(StockLine {
                product_id: item.product_id,
                name: item.name,
                quantity,
                reorder_threshold: item.reorder_threshold,
                status,
                unit_cost: item.unit_cost,
                value,
            });
        }

        report
    }

    /// Lines at or below their reorder threshold (`low` and `out`).
    pub fn low_stock(&self) -> impl Iterator<Item = &StockLine> {
        self.lines.iter().filter(|l| l.status.needs_reorder())
    }
}
