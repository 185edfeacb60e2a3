use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use stockbook_core::{CustomerId, PaymentMethod, ProductId, SupplierId};
use stockbook_infra::StockOutcome;
use stockbook_inventory::{CatalogItem, LedgerEntry, StatusFilter, StockRecord};
use stockbook_purchasing::Purchase;
use stockbook_sales::Sale;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct InitializeStockRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub new_quantity: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub before: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentLineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Unit cost (purchases) or unit price (sales), in minor units.
    pub unit_amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseRequest {
    pub invoice_number: String,
    pub supplier_id: Option<SupplierId>,
    pub purchase_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub lines: Vec<DocumentLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub invoice_number: String,
    pub customer_id: Option<CustomerId>,
    pub sale_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub lines: Vec<DocumentLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct StockReportRequest {
    #[serde(default)]
    pub status: StatusFilter,
    pub items: Vec<CatalogItem>,
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// -------------------------
// Response mapping
// -------------------------

pub fn stock_to_json(product_id: ProductId, record: Option<&StockRecord>) -> Value {
    json!({
        "product_id": product_id.to_string(),
        "quantity": record.map(|r| r.quantity).unwrap_or(0),
        "last_updated": record.map(|r| r.last_updated.to_rfc3339()),
    })
}

pub fn entry_to_json(entry: &LedgerEntry) -> Value {
    json!({
        "id": entry.id.to_string(),
        "product_id": entry.product_id.to_string(),
        "sequence": entry.sequence,
        "quantity_before": entry.quantity_before,
        "quantity_change": entry.quantity_change,
        "quantity_after": entry.quantity_after,
        "transaction_type": entry.transaction_type.as_str(),
        "reference_type": entry.reference.map(|r| r.kind.as_str()),
        "reference_id": entry.reference.and_then(|r| r.id).map(|id| id.to_string()),
        "notes": entry.notes,
        "actor": entry.actor.to_string(),
        "recorded_at": entry.recorded_at.to_rfc3339(),
    })
}

pub fn outcome_to_json(outcome: &StockOutcome) -> Value {
    json!({
        "product_id": outcome.product_id.to_string(),
        "quantity": outcome.quantity(),
        "entry": outcome.entry.as_ref().map(entry_to_json),
    })
}

pub fn purchase_to_json(purchase: &Purchase) -> Value {
    json!({
        "id": purchase.id().to_string(),
        "invoice_number": purchase.invoice_number(),
        "supplier_id": purchase.supplier_id().map(|id| id.to_string()),
        "purchase_date": purchase.purchase_date().to_string(),
        "payment_method": purchase.payment_method(),
        "status": purchase.status(),
        "notes": purchase.notes(),
        "lines": purchase.lines().iter().map(|l| json!({
            "line_no": l.line_no,
            "product_id": l.product_id.to_string(),
            "quantity": l.quantity,
            "unit_cost": l.unit_cost,
            "total": l.total(),
        })).collect::<Vec<_>>(),
        "total_amount": purchase.total_amount(),
        "received_at": purchase.received_at().map(|t| t.to_rfc3339()),
    })
}

pub fn sale_to_json(sale: &Sale) -> Value {
    json!({
        "id": sale.id().to_string(),
        "invoice_number": sale.invoice_number(),
        "customer_id": sale.customer_id().map(|id| id.to_string()),
        "sale_date": sale.sale_date().to_string(),
        "payment_method": sale.payment_method(),
        "status": sale.status(),
        "notes": sale.notes(),
        "lines": sale.lines().iter().map(|l| json!({
            "line_no": l.line_no,
            "product_id": l.product_id.to_string(),
            "quantity": l.quantity,
            "unit_price": l.unit_price,
            "total": l.total(),
        })).collect::<Vec<_>>(),
        "total_amount": sale.total_amount(),
        "completed_at": sale.completed_at().map(|t| t.to_rfc3339()),
        "cancelled_at": sale.cancelled_at().map(|t| t.to_rfc3339()),
    })
}
