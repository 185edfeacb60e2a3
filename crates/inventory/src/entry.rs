use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockbook_core::{DomainError, EntryId, ProductId, PurchaseId, SaleId, UserId};

/// Kind of quantity change recorded by a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Purchase,
    Sale,
    Adjustment,
    Return,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Purchase => "purchase",
            TransactionType::Sale => "sale",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Return => "return",
        }
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(TransactionType::Purchase),
            "sale" => Ok(TransactionType::Sale),
            "adjustment" => Ok(TransactionType::Adjustment),
            "return" => Ok(TransactionType::Return),
            other => Err(DomainError::validation(format!(
                "unknown transaction type '{other}'"
            ))),
        }
    }
}

/// Kind of business document a ledger entry points back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    Purchase,
    Sale,
    Adjustment,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Purchase => "purchase",
            ReferenceType::Sale => "sale",
            ReferenceType::Adjustment => "adjustment",
        }
    }
}

impl FromStr for ReferenceType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(ReferenceType::Purchase),
            "sale" => Ok(ReferenceType::Sale),
            "adjustment" => Ok(ReferenceType::Adjustment),
            other => Err(DomainError::validation(format!(
                "unknown reference type '{other}'"
            ))),
        }
    }
}

/// Non-owning link from a ledger entry to its originating document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceType,
    pub id: Option<Uuid>,
}

impl Reference {
    pub fn purchase(id: PurchaseId) -> Self {
        Self {
            kind: ReferenceType::Purchase,
            id: Some(id.into()),
        }
    }

    pub fn sale(id: SaleId) -> Self {
        Self {
            kind: ReferenceType::Sale,
            id: Some(id.into()),
        }
    }

    /// Manual adjustments have no separate document.
    pub fn adjustment() -> Self {
        Self {
            kind: ReferenceType::Adjustment,
            id: None,
        }
    }
}

/// One immutable row of the stock audit trail.
///
/// Entries are created exactly once per quantity change and never edited or
/// deleted. Corrections are recorded as new `adjustment` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub product_id: ProductId,
    /// 1-based position in the product's history; strictly increasing, no gaps.
    pub sequence: u64,
    pub quantity_before: i64,
    pub quantity_change: i64,
    pub quantity_after: i64,
    pub transaction_type: TransactionType,
    pub reference: Option<Reference>,
    pub notes: Option<String>,
    pub actor: UserId,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// `quantity_after == quantity_before + quantity_change`, and never negative.
    pub fn is_consistent(&self) -> bool {
        self.quantity_before.checked_add(self.quantity_change) == Some(self.quantity_after)
            && self.quantity_after >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_parses_its_own_name() {
        for t in [
            TransactionType::Purchase,
            TransactionType::Sale,
            TransactionType::Adjustment,
            TransactionType::Return,
        ] {
            assert_eq!(t.as_str().parse::<TransactionType>().unwrap(), t);
        }
        assert!("refund".parse::<TransactionType>().is_err());
    }

    #[test]
    fn transaction_type_serializes_lowercase() {
        let json = serde_json::to_value(TransactionType::Return).unwrap();
        assert_eq!(json, serde_json::json!("return"));
    }

    #[test]
    fn references_carry_document_ids() {
        let sale = SaleId::new();
        let r = Reference::sale(sale);
        assert_eq!(r.kind, ReferenceType::Sale);
        assert_eq!(r.id, Some(*sale.as_uuid()));
        assert_eq!(Reference::adjustment().id, None);
    }
}
