//! Decision step shared by every store backend.
//!
//! A store loads the current record of each affected product (under its
//! lock), feeds the commands through `UnitOfWork::decide` in order, then
//! persists the staged writes. Nothing is staged for a command that fails,
//! and a failing command aborts the whole batch.

use std::collections::{BTreeMap, BTreeSet};

use stockbook_core::{DomainError, ProductId};
use stockbook_inventory::{LedgerEntry, StockCommand, StockLevel, StockRecord};

use super::r#trait::StockOutcome;

/// Distinct products touched by a batch, in lock order.
pub(crate) fn lock_order(commands: &[StockCommand]) -> BTreeSet<ProductId> {
    commands.iter().map(|c| c.product_id).collect()
}

#[derive(Debug, Default)]
pub(crate) struct UnitOfWork {
    levels: BTreeMap<ProductId, StockLevel>,
    existed: BTreeSet<ProductId>,
    dirty: BTreeSet<ProductId>,
    entries: Vec<LedgerEntry>,
    outcomes: Vec<StockOutcome>,
}

/// Writes produced by a successful batch.
#[derive(Debug)]
pub(crate) struct StagedWrites {
    /// Changed records, each flagged with whether it existed before the batch.
    pub records: Vec<(StockRecord, bool)>,
    /// New entries in append order.
    pub entries: Vec<LedgerEntry>,
    pub outcomes: Vec<StockOutcome>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the committed state of a product before deciding against it.
    pub fn load(&mut self, product: ProductId, record: Option<StockRecord>) {
        if record.is_some() {
            self.existed.insert(product);
        }
        self.levels.insert(product, StockLevel::load(product, record));
    }

    pub fn decide(&mut self, cmd: &StockCommand) -> Result<(), DomainError> {
        let level = self.levels.get_mut(&cmd.product_id).ok_or_else(|| {
            DomainError::invariant(format!("product {} was not locked", cmd.product_id))
        })?;

        let outcome = match level.handle(cmd)? {
            Some(change) => {
                level.apply(&change);
                self.dirty.insert(cmd.product_id);
                if let Some(entry) = &change.entry {
                    self.entries.push(entry.clone());
                }
                StockOutcome {
                    product_id: cmd.product_id,
                    record: Some(change.record),
                    entry: change.entry,
                }
            }
            None => StockOutcome {
                product_id: cmd.product_id,
                record: level.record().cloned(),
                entry: None,
            },
        };
        self.outcomes.push(outcome);
        Ok(())
    }

    pub fn into_writes(mut self) -> StagedWrites {
        let records = self
            .dirty
            .iter()
            .filter_map(|p| {
                let record = self.levels.remove(p)?.into_record()?;
                Some((record, self.existed.contains(p)))
            })
            .collect();

        StagedWrites {
            records,
            entries: self.entries,
            outcomes: self.outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockbook_core::{SaleId, UserId};

    #[test]
    fn failed_command_aborts_before_anything_is_staged_for_it() {
        let product = ProductId::new();
        let actor = UserId::new();
        let mut uow = UnitOfWork::new();
        uow.load(product, None);

        uow.decide(&StockCommand::initialize(product, 2, actor)).unwrap();
        let err = uow
            .decide(&StockCommand::issue(product, 3, SaleId::new(), actor))
            .unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(product, 2, 3));

        let writes = uow.into_writes();
        assert_eq!(writes.outcomes.len(), 1);
        assert_eq!(writes.entries.len(), 1);
    }

    #[test]
    fn commands_on_one_product_chain() {
        let product = ProductId::new();
        let actor = UserId::new();
        let mut uow = UnitOfWork::new();
        uow.load(product, None);

        uow.decide(&StockCommand::initialize(product, 0, actor)).unwrap();
        uow.decide(&StockCommand::adjust(product, 4, actor, None)).unwrap();
        uow.decide(&StockCommand::issue(product, 4, SaleId::new(), actor)).unwrap();

        let writes = uow.into_writes();
        let sequences: Vec<u64> = writes.entries.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
        assert_eq!(writes.records.len(), 1);
        let (record, existed) = &writes.records[0];
        assert_eq!(record.quantity, 0);
        assert!(!*existed);
    }

    #[test]
    fn adjust_of_absent_record_stages_nothing() {
        let product = ProductId::new();
        let actor = UserId::new();
        let mut uow = UnitOfWork::new();
        uow.load(product, None);

        let err = uow
            .decide(&StockCommand::adjust(product, 4, actor, None))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        let writes = uow.into_writes();
        assert!(writes.records.is_empty());
        assert!(writes.entries.is_empty());
    }

    #[test]
    fn unlocked_product_is_rejected() {
        let mut uow = UnitOfWork::new();
        let err = uow
            .decide(&StockCommand::initialize(ProductId::new(), 1, UserId::new()))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn lock_order_is_sorted_and_distinct() {
        let a = ProductId::new();
        let b = ProductId::new();
        let actor = UserId::new();
        let cmds = vec![
            StockCommand::initialize(b, 1, actor),
            StockCommand::initialize(a, 1, actor),
            StockCommand::adjust(b, 3, actor, None),
        ];
        let order: Vec<ProductId> = lock_order(&cmds).into_iter().collect();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(order, expected);
    }
}
