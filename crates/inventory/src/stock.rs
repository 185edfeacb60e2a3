use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, EntryId, ProductId, PurchaseId, SaleId, UserId};

use crate::entry::{LedgerEntry, Reference, TransactionType};

/// Notes attached to the entry written by [`StockMovement::Initialize`].
pub const INITIAL_STOCK_NOTE: &str = "initial stock";

/// Current-quantity snapshot for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_id: ProductId,
    /// Never negative in a committed state.
    pub quantity: i64,
    pub last_updated: DateTime<Utc>,
    /// Number of ledger entries appended for this product so far.
    pub entry_count: u64,
}

impl StockRecord {
    pub fn new(product_id: ProductId, quantity: i64, last_updated: DateTime<Utc>) -> Self {
        Self {
            product_id,
            quantity,
            last_updated,
            entry_count: 0,
        }
    }
}

/// The quantity-changing operations the ledger understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockMovement {
    /// Create the record with an opening quantity.
    Initialize { quantity: i64 },
    /// Purchase receipt.
    Receive { quantity: i64, purchase_id: PurchaseId },
    /// Sale completion; subject to availability.
    Issue { quantity: i64, sale_id: SaleId },
    /// Sale cancellation.
    Restore { quantity: i64, sale_id: SaleId },
    /// Operator correction to an absolute quantity.
    Adjust {
        new_quantity: i64,
        notes: Option<String>,
    },
}

impl StockMovement {
    pub fn name(&self) -> &'static str {
        match self {
            StockMovement::Initialize { .. } => "initialize",
            StockMovement::Receive { .. } => "receive",
            StockMovement::Issue { .. } => "issue",
            StockMovement::Restore { .. } => "restore",
            StockMovement::Adjust { .. } => "adjust",
        }
    }
}

/// Command: apply one movement to one product on behalf of an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCommand {
    pub product_id: ProductId,
    pub movement: StockMovement,
    pub actor: UserId,
    /// Identifier given to the ledger entry, if the command produces one.
    pub entry_id: EntryId,
    pub occurred_at: DateTime<Utc>,
}

impl StockCommand {
    pub fn new(product_id: ProductId, movement: StockMovement, actor: UserId) -> Self {
        Self {
            product_id,
            movement,
            actor,
            entry_id: EntryId::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn initialize(product_id: ProductId, quantity: i64, actor: UserId) -> Self {
        Self::new(product_id, StockMovement::Initialize { quantity }, actor)
    }

    pub fn receive(
        product_id: ProductId,
        quantity: i64,
        purchase_id: PurchaseId,
        actor: UserId,
    ) -> Self {
        Self::new(
            product_id,
            StockMovement::Receive {
                quantity,
                purchase_id,
            },
            actor,
        )
    }

    pub fn issue(product_id: ProductId, quantity: i64, sale_id: SaleId, actor: UserId) -> Self {
        Self::new(product_id, StockMovement::Issue { quantity, sale_id }, actor)
    }

    pub fn restore(product_id: ProductId, quantity: i64, sale_id: SaleId, actor: UserId) -> Self {
        Self::new(product_id, StockMovement::Restore { quantity, sale_id }, actor)
    }

    pub fn adjust(
        product_id: ProductId,
        new_quantity: i64,
        actor: UserId,
        notes: Option<String>,
    ) -> Self {
        Self::new(
            product_id,
            StockMovement::Adjust {
                new_quantity,
                notes,
            },
            actor,
        )
    }
}

/// Outcome of a handled command: the record to persist and the entry to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub record: StockRecord,
    /// `None` only for `initialize` with a zero quantity.
    pub entry: Option<LedgerEntry>,
    /// The record did not exist before this change.
    pub created: bool,
}

/// Stock state of one product: absent, or present with a record.
///
/// Mirrors the aggregate shape used across the workspace: `handle` decides
/// without mutating, `apply` evolves the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLevel {
    product_id: ProductId,
    record: Option<StockRecord>,
}

impl StockLevel {
    /// State of a product that never had a quantity-affecting event.
    pub fn absent(product_id: ProductId) -> Self {
        Self {
            product_id,
            record: None,
        }
    }

    /// Rehydrate from whatever the store currently holds.
    pub fn load(product_id: ProductId, record: Option<StockRecord>) -> Self {
        Self { product_id, record }
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn record(&self) -> Option<&StockRecord> {
        self.record.as_ref()
    }

    pub fn into_record(self) -> Option<StockRecord> {
        self.record
    }

    pub fn exists(&self) -> bool {
        self.record.is_some()
    }

    /// Quantity on hand; 0 when no record exists.
    pub fn quantity(&self) -> i64 {
        self.record.as_ref().map(|r| r.quantity).unwrap_or(0)
    }

    /// Decide the change a command produces. Does not mutate state.
    ///
    /// `Ok(None)` means the command is a no-op (adjusting to the current value).
    pub fn handle(&self, cmd: &StockCommand) -> Result<Option<StockChange>, DomainError> {
        if cmd.product_id != self.product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }

        match &cmd.movement {
            StockMovement::Initialize { quantity } => self.handle_initialize(cmd, *quantity),
            StockMovement::Receive {
                quantity,
                purchase_id,
            } => {
                ensure_positive(*quantity)?;
                self.change(
                    cmd,
                    *quantity,
                    TransactionType::Purchase,
                    Reference::purchase(*purchase_id),
                    None,
                )
                .map(Some)
            }
            StockMovement::Issue { quantity, sale_id } => {
                ensure_positive(*quantity)?;
                let available = self.quantity();
                if available < *quantity {
                    return Err(DomainError::insufficient_stock(
                        self.product_id,
                        available,
                        *quantity,
                    ));
                }
                self.change(
                    cmd,
                    -*quantity,
                    TransactionType::Sale,
                    Reference::sale(*sale_id),
                    None,
                )
                .map(Some)
            }
            StockMovement::Restore { quantity, sale_id } => {
                ensure_positive(*quantity)?;
                self.change(
                    cmd,
                    *quantity,
                    TransactionType::Return,
                    Reference::sale(*sale_id),
                    None,
                )
                .map(Some)
            }
            StockMovement::Adjust {
                new_quantity,
                notes,
            } => {
                if !self.exists() {
                    return Err(DomainError::not_found(format!(
                        "stock record for product {}",
                        self.product_id
                    )));
                }
                if *new_quantity < 0 {
                    return Err(DomainError::validation("new_quantity cannot be negative"));
                }
                let delta = new_quantity - self.quantity();
                if delta == 0 {
                    return Ok(None);
                }
                self.change(
                    cmd,
                    delta,
                    TransactionType::Adjustment,
                    Reference::adjustment(),
                    notes.clone(),
                )
                .map(Some)
            }
        }
    }

    /// Evolve in-memory state from a decided change.
    pub fn apply(&mut self, change: &StockChange) {
        self.record = Some(change.record.clone());
    }

    fn handle_initialize(
        &self,
        cmd: &StockCommand,
        quantity: i64,
    ) -> Result<Option<StockChange>, DomainError> {
        if self.exists() {
            return Err(DomainError::already_exists(format!(
                "stock record for product {}",
                self.product_id
            )));
        }
        if quantity < 0 {
            return Err(DomainError::validation("initial quantity cannot be negative"));
        }
        if quantity == 0 {
            return Ok(Some(StockChange {
                record: StockRecord::new(self.product_id, 0, cmd.occurred_at),
                entry: None,
                created: true,
            }));
        }
        self.change(
            cmd,
            quantity,
            TransactionType::Adjustment,
            Reference::adjustment(),
            Some(INITIAL_STOCK_NOTE.to_string()),
        )
        .map(Some)
    }

    fn change(
        &self,
        cmd: &StockCommand,
        delta: i64,
        transaction_type: TransactionType,
        reference: Reference,
        notes: Option<String>,
    ) -> Result<StockChange, DomainError> {
        let before = self.quantity();
        let after = before
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("quantity overflow"))?;
        if after < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }

        let sequence = self.record.as_ref().map(|r| r.entry_count).unwrap_or(0) + 1;

        let entry = LedgerEntry {
            id: cmd.entry_id,
            product_id: self.product_id,
            sequence,
            quantity_before: before,
            quantity_change: delta,
            quantity_after: after,
            transaction_type,
            reference: Some(reference),
            notes,
            actor: cmd.actor,
            recorded_at: cmd.occurred_at,
        };

        Ok(StockChange {
            record: StockRecord {
                product_id: self.product_id,
                quantity: after,
                last_updated: cmd.occurred_at,
                entry_count: sequence,
            },
            entry: Some(entry),
            created: !self.exists(),
        })
    }
}

fn ensure_positive(quantity: i64) -> Result<(), DomainError> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(())
}
