use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{CustomerId, DomainError, PaymentMethod, ProductId, SaleId};

/// Sale status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Draft,
    Completed,
    Cancelled,
}

/// Sale line: product, quantity, unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

impl SaleLine {
    pub fn total(&self) -> u64 {
        (self.quantity.max(0) as u64).saturating_mul(self.unit_price)
    }
}

/// A customer invoice. Completing it issues stock; cancelling it restores
/// exactly what was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    id: SaleId,
    invoice_number: String,
    customer_id: Option<CustomerId>,
    sale_date: NaiveDate,
    payment_method: PaymentMethod,
    status: SaleStatus,
    notes: Option<String>,
    lines: Vec<SaleLine>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl Sale {
    /// Open a new draft sale.
    pub fn new(
        id: SaleId,
        invoice_number: impl Into<String>,
        customer_id: Option<CustomerId>,
        sale_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let invoice_number = invoice_number.into();
        if invoice_number.trim().is_empty() {
            return Err(DomainError::validation("invoice_number cannot be empty"));
        }

        Ok(Self {
            id,
            invoice_number,
            customer_id,
            sale_date,
            payment_method: PaymentMethod::default(),
            status: SaleStatus::Draft,
            notes: None,
            lines: Vec::new(),
            created_at,
            completed_at: None,
            cancelled_at: None,
        })
    }

    pub fn id(&self) -> SaleId {
        self.id
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn sale_date(&self) -> NaiveDate {
        self.sale_date
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn status(&self) -> SaleStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn total_amount(&self) -> u64 {
        self.lines
            .iter()
            .fold(0u64, |acc, l| acc.saturating_add(l.total()))
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, SaleStatus::Draft)
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
        unit_price: u64,
    ) -> Result<u32, DomainError> {
        if !self.is_modifiable() {
            return Err(DomainError::invariant(
                "cannot modify sale once it is completed or cancelled",
            ));
        }
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if unit_price == 0 {
            return Err(DomainError::validation("unit_price must be positive"));
        }

        let line_no = (self.lines.len() as u32) + 1;
        self.lines.push(SaleLine {
            line_no,
            product_id,
            quantity,
            unit_price,
        });
        Ok(line_no)
    }

    pub fn ensure_completable(&self) -> Result<(), DomainError> {
        if self.status != SaleStatus::Draft {
            return Err(DomainError::invariant("only draft sales can be completed"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("cannot complete sale without lines"));
        }
        Ok(())
    }

    /// Record completion. Stock must already have been issued for every line.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_completable()?;
        self.status = SaleStatus::Completed;
        self.completed_at = Some(at);
        Ok(())
    }

    pub fn ensure_cancellable(&self) -> Result<(), DomainError> {
        match self.status {
            SaleStatus::Completed => Ok(()),
            SaleStatus::Cancelled => Err(DomainError::invariant("sale has already been cancelled")),
            SaleStatus::Draft => Err(DomainError::invariant("only completed sales can be cancelled")),
        }
    }

    /// Record cancellation. Stock must already have been restored for every line.
    pub fn mark_cancelled(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_cancellable()?;
        self.status = SaleStatus::Cancelled;
        self.cancelled_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_sale() -> Sale {
        Sale::new(
            SaleId::new(),
            "INV-2001",
            None,
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn full_lifecycle_draft_to_completed_to_cancelled() {
        let mut sale = test_sale();
        assert_eq!(sale.status(), SaleStatus::Draft);

        sale.add_line(ProductId::new(), 2, 150).unwrap();
        sale.mark_completed(Utc::now()).unwrap();
        assert_eq!(sale.status(), SaleStatus::Completed);
        assert!(sale.completed_at().is_some());

        sale.mark_cancelled(Utc::now()).unwrap();
        assert_eq!(sale.status(), SaleStatus::Cancelled);
        assert!(sale.cancelled_at().is_some());
    }

    #[test]
    fn cannot_complete_without_lines() {
        let mut sale = test_sale();
        let err = sale.mark_completed(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn cannot_modify_completed_sale() {
        let mut sale = test_sale();
        sale.add_line(ProductId::new(), 1, 100).unwrap();
        sale.mark_completed(Utc::now()).unwrap();

        let err = sale.add_line(ProductId::new(), 1, 100).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg)
                if msg.contains("cannot modify sale once it is completed or cancelled") => {}
            other => panic!("Expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn cannot_cancel_draft_or_cancel_twice() {
        let mut sale = test_sale();
        sale.add_line(ProductId::new(), 1, 100).unwrap();
        assert!(sale.ensure_cancellable().is_err());

        sale.mark_completed(Utc::now()).unwrap();
        sale.mark_cancelled(Utc::now()).unwrap();

        let err = sale.mark_cancelled(Utc::now()).unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) if msg.contains("already been cancelled") => {}
            other => panic!("Expected InvariantViolation, got {other:?}"),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the sale total equals the sum of quantity × price over
        /// every accepted line.
        #[test]
        fn total_is_sum_of_line_totals(
            lines in prop::collection::vec((1i64..1_000, 1u64..100_000), 1..20)
        ) {
            let mut sale = test_sale();
            let mut expected: u64 = 0;
            for (quantity, price) in lines {
                sale.add_line(ProductId::new(), quantity, price).unwrap();
                expected += quantity as u64 * price;
            }
            prop_assert_eq!(sale.total_amount(), expected);
        }
    }
}
