use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, PaymentMethod, ProductId, PurchaseId, SupplierId};

/// Purchase status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Received,
    Cancelled,
}

/// Purchase line: product, quantity, unit cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Cost in smallest currency unit (e.g., cents).
    pub unit_cost: u64,
}

impl PurchaseLine {
    pub fn total(&self) -> u64 {
        (self.quantity.max(0) as u64).saturating_mul(self.unit_cost)
    }
}

/// A supplier invoice whose lines increase stock once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    id: PurchaseId,
    invoice_number: String,
    supplier_id: Option<SupplierId>,
    purchase_date: NaiveDate,
    payment_method: PaymentMethod,
    status: PurchaseStatus,
    notes: Option<String>,
    lines: Vec<PurchaseLine>,
    created_at: DateTime<Utc>,
    received_at: Option<DateTime<Utc>>,
}

impl Purchase {
    /// Open a new pending purchase.
    pub fn new(
        id: PurchaseId,
        invoice_number: impl Into<String>,
        supplier_id: Option<SupplierId>,
        purchase_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let invoice_number = invoice_number.into();
        if invoice_number.trim().is_empty() {
            return Err(DomainError::validation("invoice_number cannot be empty"));
        }

        Ok(Self {
            id,
            invoice_number,
            supplier_id,
            purchase_date,
            payment_method: PaymentMethod::default(),
            status: PurchaseStatus::Pending,
            notes: None,
            lines: Vec::new(),
            created_at,
            received_at: None,
        })
    }

    pub fn id(&self) -> PurchaseId {
        self.id
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn purchase_date(&self) -> NaiveDate {
        self.purchase_date
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn status(&self) -> PurchaseStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn lines(&self) -> &[PurchaseLine] {
        &self.lines
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    pub fn total_amount(&self) -> u64 {
        self.lines
            .iter()
            .fold(0u64, |acc, l| acc.saturating_add(l.total()))
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, PurchaseStatus::Pending)
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.payment_method = method;
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes.filter(|n| !n.trim().is_empty());
    }

    /// Append a line; returns its line number.
    pub fn add_line(
        &mut self,
        product_id: ProductId,
        quantity: i64,
        unit_cost: u64,
    ) -> Result<u32, DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "cannot modify purchase once it is received or cancelled",
            ));
        }
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if unit_cost == 0 {
            return Err(DomainError::validation("unit_cost must be positive"));
        }

        let line_no = (self.lines.len() as u32) + 1;
        self.lines.push(PurchaseLine {
            line_no,
            product_id,
            quantity,
            unit_cost,
        });
        Ok(line_no)
    }

    /// Check that stock may be received against this purchase.
    pub fn ensure_receivable(&self) -> Result<(), DomainError> {
        match self.status {
            PurchaseStatus::Pending => {}
            PurchaseStatus::Received => {
                return Err(DomainError::invariant("purchase has already been received"));
            }
            PurchaseStatus::Cancelled => {
                return Err(DomainError::invariant("cannot receive a cancelled purchase"));
            }
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot receive purchase without lines"));
        }
        Ok(())
    }

    /// Record that the goods arrived. Stock must already have been received.
    pub fn mark_received(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_receivable()?;
        self.status = PurchaseStatus::Received;
        self.received_at = Some(at);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if self.status != PurchaseStatus::Pending {
            return Err(DomainError::invariant("only pending purchases can be cancelled"));
        }
        self.status = PurchaseStatus::Cancelled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_purchase() -> Purchase {
        Purchase::new(
            PurchaseId::new(),
            "PO-1001",
            Some(SupplierId::new()),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn new_purchase_is_pending_and_empty() {
        let purchase = test_purchase();
        assert_eq!(purchase.status(), PurchaseStatus::Pending);
        assert!(purchase.lines().is_empty());
        assert_eq!(purchase.payment_method(), PaymentMethod::Cash);
    }

    #[test]
    fn blank_invoice_number_is_rejected() {
        let err = Purchase::new(
            PurchaseId::new(),
            "  ",
            None,
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn lines_are_numbered_and_totalled() {
        let mut purchase = test_purchase();
        assert_eq!(purchase.add_line(ProductId::new(), 3, 250).unwrap(), 1);
        assert_eq!(purchase.add_line(ProductId::new(), 2, 100).unwrap(), 2);
        assert_eq!(purchase.total_amount(), 950);
    }

    #[test]
    fn invalid_lines_are_rejected() {
        let mut purchase = test_purchase();
        assert!(matches!(
            purchase.add_line(ProductId::new(), 0, 100).unwrap_err(),
            DomainError::Validation(_)
        ));
        assert!(matches!(
            purchase.add_line(ProductId::new(), 1, 0).unwrap_err(),
            DomainError::Validation(_)
        ));
    }

    #[test]
    fn cannot_receive_without_lines() {
        let purchase = test_purchase();
        let err = purchase.ensure_receivable().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn cannot_receive_twice() {
        let mut purchase = test_purchase();
        purchase.add_line(ProductId::new(), 1, 100).unwrap();
        purchase.mark_received(Utc::now()).unwrap();
        assert_eq!(purchase.status(), PurchaseStatus::Received);
        assert!(purchase.received_at().is_some());

        let err = purchase.mark_received(Utc::now()).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("already been received") => {}
            other => panic!("Expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn received_purchase_is_frozen() {
        let mut purchase = test_purchase();
        purchase.add_line(ProductId::new(), 1, 100).unwrap();
        purchase.mark_received(Utc::now()).unwrap();

        assert!(purchase.add_line(ProductId::new(), 1, 100).is_err());
        assert!(purchase.cancel().is_err());
    }

    #[test]
    fn cancelled_purchase_cannot_be_received() {
        let mut purchase = test_purchase();
        purchase.add_line(ProductId::new(), 1, 100).unwrap();
        purchase.cancel().unwrap();
        assert!(purchase.ensure_receivable().is_err());
    }
}
