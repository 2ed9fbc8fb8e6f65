//! LedgerRepository trait definition.
//!
//! The ledger repository is the only component allowed to change a wallet
//! balance. Every balance change it performs is written together with its
//! Transaction row in one storage transaction.

use chrono::{DateTime, Utc};
use mentorline_types::error::RepositoryError;
use mentorline_types::wallet::Transaction;
use uuid::Uuid;

/// Result of a conditional debit.
#[derive(Debug, Clone)]
pub enum DebitOutcome {
    /// The wallet was debited and the completed Transaction appended.
    Debited(Transaction),
    /// The wallet held less than the requested amount. Nothing was written.
    Insufficient { available: i64 },
}

/// A credit to apply to a wallet.
#[derive(Debug, Clone)]
pub struct CreditRequest {
    pub user_id: Uuid,
    pub amount: i64,
    pub description: String,
    /// Payment-gateway order id. When set, the credit is applied at most once
    /// per reference.
    pub external_ref: Option<String>,
    pub external_payment_id: Option<String>,
}

/// Result of a credit.
#[derive(Debug, Clone)]
pub enum CreditOutcome {
    /// The balance was increased by this call.
    Applied(Transaction),
    /// A completed Transaction with the same external reference already
    /// existed; the balance was left untouched.
    AlreadyApplied(Transaction),
}

impl CreditOutcome {
    pub fn transaction(&self) -> &Transaction {
        match self {
            CreditOutcome::Applied(tx) | CreditOutcome::AlreadyApplied(tx) => tx,
        }
    }

    pub fn into_transaction(self) -> Transaction {
        match self {
            CreditOutcome::Applied(tx) | CreditOutcome::AlreadyApplied(tx) => tx,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, CreditOutcome::Applied(_))
    }
}

/// Repository trait for wallet balances and their transaction history.
///
/// Implementations live in mentorline-infra (e.g., `SqliteLedgerRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait LedgerRepository: Send + Sync {
    /// Current balance for a user. Users without a wallet have balance 0.
    fn balance(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    /// Atomically decrease the balance by `amount` if it is at least `amount`,
    /// appending a completed debit Transaction.
    ///
    /// Concurrent debits for the same user must never both succeed against the
    /// same pre-decrement balance.
    fn debit(
        &self,
        user_id: &Uuid,
        amount: i64,
        description: &str,
    ) -> impl std::future::Future<Output = Result<DebitOutcome, RepositoryError>> + Send;

    /// Increase a balance.
    ///
    /// With an `external_ref`:
    /// - an existing completed Transaction for that reference makes the call a
    ///   no-op returning it,
    /// - an existing pending credit for that reference is settled (marked
    ///   completed) and applied,
    /// - an existing Transaction for another user, another amount, or in the
    ///   failed state yields `RepositoryError::Conflict`.
    fn credit(
        &self,
        request: &CreditRequest,
    ) -> impl std::future::Future<Output = Result<CreditOutcome, RepositoryError>> + Send;

    /// Insert a pending credit. Fails with `RepositoryError::Conflict` if a
    /// Transaction with the same external reference already exists.
    fn insert_pending(
        &self,
        transaction: &Transaction,
    ) -> impl std::future::Future<Output = Result<Transaction, RepositoryError>> + Send;

    /// Find the Transaction bound to a payment-gateway order id.
    fn find_by_external_ref(
        &self,
        external_ref: &str,
    ) -> impl std::future::Future<Output = Result<Option<Transaction>, RepositoryError>> + Send;

    /// Transition a pending Transaction to failed. Returns `false` if it was
    /// not pending.
    fn mark_failed(
        &self,
        external_ref: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Transactions for a user, most recent first.
    fn history(
        &self,
        user_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Transaction>, RepositoryError>> + Send;

    /// Pending Transactions created before `cutoff`, oldest first.
    fn pending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<Transaction>, RepositoryError>> + Send;
}
