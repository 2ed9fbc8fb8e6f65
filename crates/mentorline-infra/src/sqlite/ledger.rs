//! SQLite ledger repository implementation.
//!
//! Implements `LedgerRepository` from `mentorline-core`. Every balance change
//! runs on the single-connection writer pool inside one database transaction
//! together with its `transactions` row. The debit is a conditional
//! `UPDATE ... WHERE balance >= ?`, so a short wallet is detected by the
//! absence of a returned row rather than by a separate read.

use chrono::Utc;
use mentorline_core::repository::LedgerRepository;
use mentorline_core::repository::ledger::{CreditOutcome, CreditRequest, DebitOutcome};
use mentorline_types::error::RepositoryError;
use mentorline_types::wallet::{Transaction, TransactionKind, TransactionStatus};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_err, write_err};

/// SQLite-backed implementation of `LedgerRepository`.
#[derive(Clone)]
pub struct SqliteLedgerRepository {
    pool: DatabasePool,
}

impl SqliteLedgerRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct TransactionRow {
    id: String,
    user_id: String,
    kind: String,
    amount: i64,
    resulting_balance: Option<i64>,
    description: String,
    external_ref: Option<String>,
    external_payment_id: Option<String>,
    status: String,
    created_at: String,
}

impl TransactionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            kind: row.try_get("kind")?,
            amount: row.try_get("amount")?,
            resulting_balance: row.try_get("resulting_balance")?,
            description: row.try_get("description")?,
            external_ref: row.try_get("external_ref")?,
            external_payment_id: row.try_get("external_payment_id")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_transaction(self) -> Result<Transaction, RepositoryError> {
        let kind: TransactionKind = self
            .kind
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let status: TransactionStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Transaction {
            id: parse_uuid(&self.id, "transaction id")?,
            user_id: parse_uuid(&self.user_id, "user_id")?,
            kind,
            amount: self.amount,
            resulting_balance: self.resulting_balance,
            description: self.description,
            external_ref: self.external_ref,
            external_payment_id: self.external_payment_id,
            status,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn map_rows(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<Transaction>, RepositoryError> {
    rows.iter()
        .map(|row| {
            TransactionRow::from_row(row)
                .map_err(query_err)?
                .into_transaction()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Connection-level helpers shared with the session repository
// ---------------------------------------------------------------------------

pub(crate) async fn insert_transaction(
    conn: &mut SqliteConnection,
    tx: &Transaction,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"INSERT INTO transactions (id, user_id, kind, amount, resulting_balance, description, external_ref, external_payment_id, status, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(tx.id.to_string())
    .bind(tx.user_id.to_string())
    .bind(tx.kind.to_string())
    .bind(tx.amount)
    .bind(tx.resulting_balance)
    .bind(&tx.description)
    .bind(&tx.external_ref)
    .bind(&tx.external_payment_id)
    .bind(tx.status.to_string())
    .bind(format_datetime(&tx.created_at))
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        write_err(e, || {
            format!(
                "external reference '{}' already exists",
                tx.external_ref.as_deref().unwrap_or_default()
            )
        })
    })?;
    Ok(())
}

/// Conditionally debit a wallet on an open connection or transaction.
///
/// The caller owns the surrounding database transaction and decides whether
/// to commit.
pub(crate) async fn debit_in_tx(
    conn: &mut SqliteConnection,
    user_id: &Uuid,
    amount: i64,
    description: &str,
) -> Result<DebitOutcome, RepositoryError> {
    let now = Utc::now();
    let row = sqlx::query(
        r#"UPDATE wallets SET balance = balance - ?, updated_at = ?
           WHERE user_id = ? AND balance >= ?
           RETURNING balance"#,
    )
    .bind(amount)
    .bind(format_datetime(&now))
    .bind(user_id.to_string())
    .bind(amount)
    .fetch_optional(&mut *conn)
    .await
    .map_err(query_err)?;

    let Some(row) = row else {
        let available: Option<i64> =
            sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = ?")
                .bind(user_id.to_string())
                .fetch_optional(&mut *conn)
                .await
                .map_err(query_err)?;
        return Ok(DebitOutcome::Insufficient {
            available: available.unwrap_or(0),
        });
    };
    let balance: i64 = row.try_get("balance").map_err(query_err)?;

    let tx = Transaction {
        id: Uuid::now_v7(),
        user_id: *user_id,
        kind: TransactionKind::Debit,
        amount,
        resulting_balance: Some(balance),
        description: description.to_string(),
        external_ref: None,
        external_payment_id: None,
        status: TransactionStatus::Completed,
        created_at: now,
    };
    insert_transaction(conn, &tx).await?;

    Ok(DebitOutcome::Debited(tx))
}

/// Add to a wallet, creating it on first credit. Returns the new balance.
async fn add_to_wallet(
    conn: &mut SqliteConnection,
    user_id: &Uuid,
    amount: i64,
) -> Result<i64, RepositoryError> {
    sqlx::query_scalar(
        r#"INSERT INTO wallets (user_id, balance, updated_at) VALUES (?, ?, ?)
           ON CONFLICT(user_id) DO UPDATE
           SET balance = balance + excluded.balance, updated_at = excluded.updated_at
           RETURNING balance"#,
    )
    .bind(user_id.to_string())
    .bind(amount)
    .bind(format_datetime(&Utc::now()))
    .fetch_one(&mut *conn)
    .await
    .map_err(query_err)
}

async fn find_by_ref(
    conn: &mut SqliteConnection,
    external_ref: &str,
) -> Result<Option<Transaction>, RepositoryError> {
    let row = sqlx::query("SELECT * FROM transactions WHERE external_ref = ?")
        .bind(external_ref)
        .fetch_optional(&mut *conn)
        .await
        .map_err(query_err)?;

    row.map(|row| {
        TransactionRow::from_row(&row)
            .map_err(query_err)?
            .into_transaction()
    })
    .transpose()
}

// ---------------------------------------------------------------------------
// LedgerRepository implementation
// ---------------------------------------------------------------------------

impl LedgerRepository for SqliteLedgerRepository {
    async fn balance(&self, user_id: &Uuid) -> Result<i64, RepositoryError> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = ?")
                .bind(user_id.to_string())
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(query_err)?;
        Ok(balance.unwrap_or(0))
    }

    async fn debit(
        &self,
        user_id: &Uuid,
        amount: i64,
        description: &str,
    ) -> Result<DebitOutcome, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        let outcome = debit_in_tx(&mut tx, user_id, amount, description).await?;
        if matches!(outcome, DebitOutcome::Debited(_)) {
            tx.commit().await.map_err(query_err)?;
        }
        Ok(outcome)
    }

    async fn credit(&self, request: &CreditRequest) -> Result<CreditOutcome, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        if let Some(external_ref) = request.external_ref.as_deref() {
            if let Some(existing) = find_by_ref(&mut tx, external_ref).await? {
                if existing.user_id != request.user_id
                    || existing.amount != request.amount
                    || existing.kind != TransactionKind::Credit
                {
                    return Err(RepositoryError::Conflict(format!(
                        "external reference '{external_ref}' belongs to another credit"
                    )));
                }

                match existing.status {
                    TransactionStatus::Completed => {
                        return Ok(CreditOutcome::AlreadyApplied(existing));
                    }
                    TransactionStatus::Failed => {
                        return Err(RepositoryError::Conflict(format!(
                            "external reference '{external_ref}' has failed"
                        )));
                    }
                    TransactionStatus::Pending => {
                        let balance = add_to_wallet(&mut tx, &request.user_id, request.amount).await?;
                        let updated = sqlx::query(
                            r#"UPDATE transactions
                               SET status = 'completed', resulting_balance = ?,
                                   external_payment_id = COALESCE(?, external_payment_id)
                               WHERE id = ? AND status = 'pending'"#,
                        )
                        .bind(balance)
                        .bind(&request.external_payment_id)
                        .bind(existing.id.to_string())
                        .execute(&mut *tx)
                        .await
                        .map_err(query_err)?;

                        if updated.rows_affected() != 1 {
                            return Err(RepositoryError::Conflict(format!(
                                "external reference '{external_ref}' changed concurrently"
                            )));
                        }
                        tx.commit().await.map_err(query_err)?;

                        return Ok(CreditOutcome::Applied(Transaction {
                            resulting_balance: Some(balance),
                            external_payment_id: request
                                .external_payment_id
                                .clone()
                                .or(existing.external_payment_id),
                            status: TransactionStatus::Completed,
                            ..existing
                        }));
                    }
                }
            }
        }

        let balance = add_to_wallet(&mut tx, &request.user_id, request.amount).await?;
        let credit = Transaction {
            id: Uuid::now_v7(),
            user_id: request.user_id,
            kind: TransactionKind::Credit,
            amount: request.amount,
            resulting_balance: Some(balance),
            description: request.description.clone(),
            external_ref: request.external_ref.clone(),
            external_payment_id: request.external_payment_id.clone(),
            status: TransactionStatus::Completed,
            created_at: Utc::now(),
        };
        insert_transaction(&mut tx, &credit).await?;
        tx.commit().await.map_err(query_err)?;

        Ok(CreditOutcome::Applied(credit))
    }

    async fn insert_pending(&self, transaction: &Transaction) -> Result<Transaction, RepositoryError> {
        let mut conn = self.pool.writer.acquire().await.map_err(query_err)?;
        insert_transaction(&mut conn, transaction).await?;
        Ok(transaction.clone())
    }

    async fn find_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Transaction>, RepositoryError> {
        let mut conn = self.pool.reader.acquire().await.map_err(query_err)?;
        find_by_ref(&mut conn, external_ref).await
    }

    async fn mark_failed(&self, external_ref: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE transactions SET status = 'failed' WHERE external_ref = ? AND status = 'pending'",
        )
        .bind(external_ref)
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn history(
        &self,
        user_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM transactions WHERE user_id = ?
               ORDER BY created_at DESC, rowid DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(user_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        map_rows(rows)
    }

    async fn pending_before(
        &self,
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM transactions WHERE status = 'pending' AND created_at < ?
               ORDER BY created_at ASC"#,
        )
        .bind(format_datetime(&cutoff))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        map_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_repo() -> (SqliteLedgerRepository, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (SqliteLedgerRepository::new(pool), dir)
    }

    fn credit(user_id: Uuid, amount: i64, external_ref: Option<&str>) -> CreditRequest {
        CreditRequest {
            user_id,
            amount,
            description: "top-up".to_string(),
            external_ref: external_ref.map(str::to_string),
            external_payment_id: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_wallet_has_zero_balance() {
        let (repo, _dir) = test_repo().await;
        assert_eq!(repo.balance(&Uuid::now_v7()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_credit_then_debit() {
        let (repo, _dir) = test_repo().await;
        let user = Uuid::now_v7();

        let outcome = repo.credit(&credit(user, 100, None)).await.unwrap();
        assert!(outcome.was_applied());
        assert_eq!(outcome.transaction().resulting_balance, Some(100));

        match repo.debit(&user, 30, "message").await.unwrap() {
            DebitOutcome::Debited(tx) => {
                assert_eq!(tx.resulting_balance, Some(70));
                assert_eq!(tx.kind, TransactionKind::Debit);
                assert_eq!(tx.status, TransactionStatus::Completed);
            }
            other => panic!("expected debit, got {other:?}"),
        }
        assert_eq!(repo.balance(&user).await.unwrap(), 70);
    }

    #[tokio::test]
    async fn test_debit_refused_writes_nothing() {
        let (repo, _dir) = test_repo().await;
        let user = Uuid::now_v7();
        repo.credit(&credit(user, 5, None)).await.unwrap();

        match repo.debit(&user, 6, "message").await.unwrap() {
            DebitOutcome::Insufficient { available } => assert_eq!(available, 5),
            other => panic!("expected refusal, got {other:?}"),
        }
        assert_eq!(repo.balance(&user).await.unwrap(), 5);
        assert_eq!(repo.history(&user, 10, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_debit_without_wallet_reports_zero() {
        let (repo, _dir) = test_repo().await;
        match repo.debit(&Uuid::now_v7(), 1, "message").await.unwrap() {
            DebitOutcome::Insufficient { available } => assert_eq!(available, 0),
            other => panic!("expected refusal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_credit_with_same_ref_applies_once() {
        let (repo, _dir) = test_repo().await;
        let user = Uuid::now_v7();

        let first = repo.credit(&credit(user, 50, Some("o1"))).await.unwrap();
        let second = repo.credit(&credit(user, 50, Some("o1"))).await.unwrap();

        assert!(first.was_applied());
        assert!(!second.was_applied());
        assert_eq!(first.transaction().id, second.transaction().id);
        assert_eq!(repo.balance(&user).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_credit_ref_for_other_user_conflicts() {
        let (repo, _dir) = test_repo().await;
        repo.credit(&credit(Uuid::now_v7(), 50, Some("o1"))).await.unwrap();

        let err = repo
            .credit(&credit(Uuid::now_v7(), 50, Some("o1")))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_pending_is_settled_by_credit() {
        let (repo, _dir) = test_repo().await;
        let user = Uuid::now_v7();
        let pending = Transaction {
            id: Uuid::now_v7(),
            user_id: user,
            kind: TransactionKind::Credit,
            amount: 500,
            resulting_balance: None,
            description: "Wallet top-up".to_string(),
            external_ref: Some("o2".to_string()),
            external_payment_id: None,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        };
        repo.insert_pending(&pending).await.unwrap();
        assert!(matches!(
            repo.insert_pending(&Transaction {
                id: Uuid::now_v7(),
                ..pending.clone()
            })
            .await,
            Err(RepositoryError::Conflict(_))
        ));

        let mut request = credit(user, 500, Some("o2"));
        request.external_payment_id = Some("pay_2".to_string());
        let outcome = repo.credit(&request).await.unwrap();

        let settled = outcome.transaction();
        assert_eq!(settled.id, pending.id);
        assert_eq!(settled.status, TransactionStatus::Completed);
        assert_eq!(settled.external_payment_id.as_deref(), Some("pay_2"));

        let stored = repo.find_by_external_ref("o2").await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Completed);
        assert_eq!(stored.resulting_balance, Some(500));
        assert_eq!(repo.balance(&user).await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_mark_failed_only_touches_pending() {
        let (repo, _dir) = test_repo().await;
        let user = Uuid::now_v7();
        repo.credit(&credit(user, 10, Some("done"))).await.unwrap();
        assert!(!repo.mark_failed("done").await.unwrap());
        assert!(!repo.mark_failed("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_history_most_recent_first() {
        let (repo, _dir) = test_repo().await;
        let user = Uuid::now_v7();
        repo.credit(&credit(user, 100, None)).await.unwrap();
        repo.debit(&user, 10, "first").await.unwrap();
        repo.debit(&user, 20, "second").await.unwrap();

        let history = repo.history(&user, 10, 0).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].description, "second");
        assert_eq!(history[2].kind, TransactionKind::Credit);

        let page = repo.history(&user, 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].description, "first");
    }
}
