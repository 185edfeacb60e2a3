//! Postgres-backed ledger store.
//!
//! Every `transact` call is one SQL transaction. Existing stock rows are
//! locked with `SELECT ... FOR UPDATE` in ascending product-id order, the
//! pure decision logic runs against the locked rows, and the new record
//! values and ledger entries are written before commit.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | LedgerError | Scenario |
//! |------------|----------------------|-------------|----------|
//! | Database (unique violation) | `23505` | `ConflictRetryable` | Two transactions created the same product's record, or raced on a sequence |
//! | Database (serialization failure) | `40001` | `ConflictRetryable` | Transaction could not be serialised |
//! | Database (deadlock detected) | `40P01` | `ConflictRetryable` | Lock cycle between transactions |
//! | Database (check / restrict violation) | `23514` / `23001` | `Storage` | Row rejected by schema constraints or the append-only trigger |
//! | Database (other) | Any other | `Storage` | Other database errors |
//! | PoolClosed / Other | N/A | `Storage` | Network errors, closed pool, etc. |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use stockbook_core::{DomainError, EntryId, ProductId, UserId};
use stockbook_inventory::{
    LedgerEntry, Reference, ReferenceType, StockCommand, StockRecord, TransactionType,
};

use super::r#trait::{HistoryPage, LedgerStore, StockOutcome};
use super::unit_of_work::{UnitOfWork, lock_order};
use crate::error::LedgerError;

const SCHEMA: &str = include_str!("../../sql/ledger_schema.sql");

/// Postgres-backed ledger store.
///
/// `Send + Sync`; the SQLx pool handles connection sharing.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables, constraints and the append-only trigger if missing.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(
        skip(self, commands),
        fields(command_count = commands.len(), entries_appended = tracing::field::Empty),
        err
    )]
    async fn transact(&self, commands: Vec<StockCommand>) -> Result<Vec<StockOutcome>, LedgerError> {
        if commands.is_empty() {
            return Ok(vec![]);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut uow = UnitOfWork::new();
        for product in lock_order(&commands) {
            let record = lock_record(&mut tx, product).await?;
            uow.load(product, record);
        }

        for cmd in &commands {
            if let Err(err) = uow.decide(cmd) {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(err.into());
            }
        }

        let writes = uow.into_writes();
        for (record, existed) in &writes.records {
            if *existed {
                update_record(&mut tx, record).await?;
            } else {
                insert_record(&mut tx, record).await?;
            }
        }
        for entry in &writes.entries {
            insert_entry(&mut tx, entry).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("entries_appended", writes.entries.len());
        Ok(writes.outcomes)
    }

    #[instrument(skip(self), fields(product_id = %product), err)]
    async fn get(&self, product: ProductId) -> Result<Option<StockRecord>, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT product_id, quantity, entry_count, last_updated
            FROM stock_records
            WHERE product_id = $1
            "#,
        )
        .bind(product.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_record", e))?;

        row.as_ref().map(record_from_row).transpose()
    }

    #[instrument(
        skip(self),
        fields(
            product_id = %product,
            before = ?page.before,
            limit = page.limit,
            entry_count = tracing::field::Empty
        ),
        err
    )]
    async fn list_by_product(
        &self,
        product: ProductId,
        page: HistoryPage,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let before: Option<i64> = page.before.map(|s| s as i64);
        let rows = sqlx::query(
            r#"
            SELECT
                entry_id,
                product_id,
                sequence,
                quantity_before,
                quantity_change,
                quantity_after,
                transaction_type,
                reference_type,
                reference_id,
                notes,
                actor_id,
                recorded_at
            FROM ledger_entries
            WHERE product_id = $1
                AND ($2::bigint IS NULL OR sequence < $2)
            ORDER BY sequence DESC
            LIMIT $3
            "#,
        )
        .bind(product.as_uuid())
        .bind(before)
        .bind(page.limit as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_by_product", e))?;

        let entries = rows.iter().map(entry_from_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("entry_count", entries.len());
        Ok(entries)
    }

    #[instrument(skip(self), fields(product_id = %product), err)]
    async fn remove(&self, product: ProductId) -> Result<bool, LedgerError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Lock the record so no entry can be appended between count and delete.
        lock_record(&mut tx, product).await?;

        let entries: i64 = sqlx::query("SELECT COUNT(*) AS entries FROM ledger_entries WHERE product_id = $1")
            .bind(product.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("count_entries", e))?
            .try_get("entries")
            .map_err(|e| LedgerError::storage(format!("failed to read entry count: {e}")))?;

        if entries > 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(DomainError::HistoryRetained {
                product,
                entries: entries as u64,
            }
            .into());
        }

        let deleted = sqlx::query("DELETE FROM stock_records WHERE product_id = $1")
            .bind(product.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_record", e))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(deleted > 0)
    }
}

async fn lock_record(
    tx: &mut Transaction<'_, Postgres>,
    product: ProductId,
) -> Result<Option<StockRecord>, LedgerError> {
    let row = sqlx::query(
        r#"
        SELECT product_id, quantity, entry_count, last_updated
        FROM stock_records
        WHERE product_id = $1
        FOR UPDATE
        "#,
    )
    .bind(product.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_record", e))?;

    row.as_ref().map(record_from_row).transpose()
}

async fn insert_record(
    tx: &mut Transaction<'_, Postgres>,
    record: &StockRecord,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO stock_records (product_id, quantity, entry_count, last_updated)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(record.product_id.as_uuid())
    .bind(record.quantity)
    .bind(record.entry_count as i64)
    .bind(record.last_updated)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            LedgerError::conflict(format!(
                "stock record for product {} was created concurrently",
                record.product_id
            ))
        } else {
            map_sqlx_error("insert_record", e)
        }
    })?;
    Ok(())
}

async fn update_record(
    tx: &mut Transaction<'_, Postgres>,
    record: &StockRecord,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        UPDATE stock_records
        SET quantity = $2, entry_count = $3, last_updated = $4
        WHERE product_id = $1
        "#,
    )
    .bind(record.product_id.as_uuid())
    .bind(record.quantity)
    .bind(record.entry_count as i64)
    .bind(record.last_updated)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("update_record", e))?;
    Ok(())
}

async fn insert_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &LedgerEntry,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO ledger_entries (
            entry_id,
            product_id,
            sequence,
            quantity_before,
            quantity_change,
            quantity_after,
            transaction_type,
            reference_type,
            reference_id,
            notes,
            actor_id,
            recorded_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(entry.id.as_uuid())
    .bind(entry.product_id.as_uuid())
    .bind(entry.sequence as i64)
    .bind(entry.quantity_before)
    .bind(entry.quantity_change)
    .bind(entry.quantity_after)
    .bind(entry.transaction_type.as_str())
    .bind(entry.reference.map(|r| r.kind.as_str()))
    .bind(entry.reference.and_then(|r| r.id))
    .bind(entry.notes.as_deref())
    .bind(entry.actor.as_uuid())
    .bind(entry.recorded_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            LedgerError::conflict(format!(
                "sequence {} already exists for product {}",
                entry.sequence, entry.product_id
            ))
        } else {
            map_sqlx_error("insert_entry", e)
        }
    })?;
    Ok(())
}

// Row decoding

fn record_from_row(row: &PgRow) -> Result<StockRecord, LedgerError> {
    let decode = |e: sqlx::Error| LedgerError::storage(format!("failed to decode stock row: {e}"));

    let product_id: uuid::Uuid = row.try_get("product_id").map_err(decode)?;
    let quantity: i64 = row.try_get("quantity").map_err(decode)?;
    let entry_count: i64 = row.try_get("entry_count").map_err(decode)?;
    let last_updated: DateTime<Utc> = row.try_get("last_updated").map_err(decode)?;

    Ok(StockRecord {
        product_id: ProductId::from_uuid(product_id),
        quantity,
        last_updated,
        entry_count: entry_count as u64,
    })
}

fn entry_from_row(row: &PgRow) -> Result<LedgerEntry, LedgerError> {
    let decode = |e: sqlx::Error| LedgerError::storage(format!("failed to decode ledger row: {e}"));
    let corrupt = |e: DomainError| LedgerError::storage(format!("corrupt ledger row: {e}"));

    let transaction_type: String = row.try_get("transaction_type").map_err(decode)?;
    let reference_type: Option<String> = row.try_get("reference_type").map_err(decode)?;
    let reference_id: Option<uuid::Uuid> = row.try_get("reference_id").map_err(decode)?;
    let sequence: i64 = row.try_get("sequence").map_err(decode)?;

    let reference = reference_type
        .map(|kind| {
            Ok::<_, LedgerError>(Reference {
                kind: kind.parse::<ReferenceType>().map_err(corrupt)?,
                id: reference_id,
            })
        })
        .transpose()?;

    Ok(LedgerEntry {
        id: EntryId::from_uuid(row.try_get("entry_id").map_err(decode)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(decode)?),
        sequence: sequence as u64,
        quantity_before: row.try_get("quantity_before").map_err(decode)?,
        quantity_change: row.try_get("quantity_change").map_err(decode)?,
        quantity_after: row.try_get("quantity_after").map_err(decode)?,
        transaction_type: transaction_type
            .parse::<TransactionType>()
            .map_err(corrupt)?,
        reference,
        notes: row.try_get("notes").map_err(decode)?,
        actor: UserId::from_uuid(row.try_get("actor_id").map_err(decode)?),
        recorded_at: row.try_get("recorded_at").map_err(decode)?,
    })
}

// Error mapping

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // unique violation, serialization failure, deadlock
                Some("23505") | Some("40001") | Some("40P01") => LedgerError::ConflictRetryable(msg),
                _ => LedgerError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            LedgerError::Storage(format!("connection pool closed in {}", operation))
        }
        _ => LedgerError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

#[cfg(test)]
mod tests {
    //! Requires a scratch database: `DATABASE_URL=postgres://... cargo test -- --ignored`.

    use super::*;
    use stockbook_core::{PurchaseId, SaleId};

    async fn test_store() -> PostgresLedgerStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for Postgres tests");
        let store = PostgresLedgerStore::connect(&url, 5).await.unwrap();
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    #[ignore]
    async fn postgres_round_trips_scenario() {
        let store = test_store().await;
        let product = ProductId::new();
        let actor = UserId::new();
        let sale = SaleId::new();

        store
            .transact(vec![StockCommand::initialize(product, 5, actor)])
            .await
            .unwrap();
        store
            .transact(vec![StockCommand::issue(product, 3, sale, actor)])
            .await
            .unwrap();

        let err = store
            .transact(vec![StockCommand::issue(product, 5, SaleId::new(), actor)])
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::Domain(DomainError::insufficient_stock(product, 2, 5)));

        store
            .transact(vec![StockCommand::restore(product, 3, sale, actor)])
            .await
            .unwrap();

        let record = store.get(product).await.unwrap().unwrap();
        assert_eq!(record.quantity, 5);
        assert_eq!(record.entry_count, 3);

        let history = store
            .list_by_product(product, HistoryPage::first(10))
            .await
            .unwrap();
        assert_eq!(
            history.iter().map(|e| e.transaction_type).collect::<Vec<_>>(),
            vec![
                TransactionType::Return,
                TransactionType::Sale,
                TransactionType::Adjustment
            ]
        );
        assert_eq!(history[0].reference, Some(Reference::sale(sale)));
        assert!(history.iter().all(LedgerEntry::is_consistent));
    }

    #[tokio::test]
    #[ignore]
    async fn postgres_rejects_ledger_mutation_and_removal_with_history() {
        let store = test_store().await;
        let product = ProductId::new();
        let actor = UserId::new();
        store
            .transact(vec![StockCommand::receive(product, 4, PurchaseId::new(), actor)])
            .await
            .unwrap();

        let updated = sqlx::query("UPDATE ledger_entries SET notes = 'edited' WHERE product_id = $1")
            .bind(product.as_uuid())
            .execute(store.pool())
            .await;
        assert!(updated.is_err());

        let err = store.remove(product).await.unwrap_err();
        assert!(matches!(err, LedgerError::Domain(DomainError::HistoryRetained { entries: 1, .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore]
    async fn postgres_concurrent_issues_never_oversell() {
        let store = Arc::new(test_store().await);
        let product = ProductId::new();
        let actor = UserId::new();
        store
            .transact(vec![StockCommand::initialize(product, 3, actor)])
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .transact(vec![StockCommand::issue(product, 1, SaleId::new(), actor)])
                    .await
            }));
        }

        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(LedgerError::Domain(DomainError::InsufficientStock { .. })) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(ok, 3);
        assert_eq!(store.get(product).await.unwrap().unwrap().quantity, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore]
    async fn postgres_racing_first_receipts_are_retryable_or_applied() {
        let store = Arc::new(test_store().await);
        let product = ProductId::new();
        let actor = UserId::new();

        let mut handles = Vec::new();
        for quantity in 1..=8i64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let result = store
                    .transact(vec![StockCommand::receive(
                        product,
                        quantity,
                        PurchaseId::new(),
                        actor,
                    )])
                    .await;
                (quantity, result)
            }));
        }

        let mut received = 0;
        let mut applied = 0;
        for h in handles {
            match h.await.unwrap() {
                (quantity, Ok(_)) => {
                    received += quantity;
                    applied += 1;
                }
                (_, Err(err)) => assert!(err.is_retryable(), "unexpected error: {err:?}"),
            }
        }

        assert!(applied >= 1);
        let record = store.get(product).await.unwrap().unwrap();
        assert_eq!(record.quantity, received);
        assert_eq!(record.entry_count, applied);

        let history = store
            .list_by_product(product, HistoryPage::first(100))
            .await
            .unwrap();
        assert_eq!(history.len() as u64, applied);
        assert_eq!(history.iter().map(|e| e.quantity_change).sum::<i64>(), received);
    }
}
