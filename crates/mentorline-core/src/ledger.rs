//! Ledger service: the single authority over wallet balances.
//!
//! `Ledger` validates amounts and translates repository outcomes into
//! `EngineError`s. The atomic read-compare-decrement itself is delegated to
//! the `LedgerRepository`, which must perform it in one storage transaction.

use mentorline_types::error::{EngineError, RepositoryError};
use mentorline_types::wallet::{Transaction, TransactionPage};
use tracing::{debug, info};
use uuid::Uuid;

use crate::repository::ledger::{CreditOutcome, CreditRequest, DebitOutcome};
use crate::repository::LedgerRepository;

/// Default page size for transaction history.
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// Largest page of transaction history a caller may request.
pub const MAX_HISTORY_LIMIT: u32 = 100;

/// Wallet balance authority. Generic over the storage backend.
pub struct Ledger<R: LedgerRepository> {
    repo: R,
}

impl<R: LedgerRepository> Ledger<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Access the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Current balance for a user. Unknown users have balance 0.
    pub async fn balance(&self, user_id: &Uuid) -> Result<i64, EngineError> {
        Ok(self.repo.balance(user_id).await?)
    }

    /// Decrease a balance by `amount`.
    ///
    /// Fails with `InsufficientBalance` without writing anything when the
    /// wallet holds less than `amount`.
    pub async fn debit(
        &self,
        user_id: &Uuid,
        amount: i64,
        description: &str,
    ) -> Result<Transaction, EngineError> {
        validate_amount(amount)?;

        match self.repo.debit(user_id, amount, description).await? {
            DebitOutcome::Debited(tx) => {
                info!(
                    user_id = %user_id,
                    amount,
                    balance = tx.resulting_balance,
                    "Wallet debited"
                );
                Ok(tx)
            }
            DebitOutcome::Insufficient { available } => {
                debug!(user_id = %user_id, amount, available, "Debit refused");
                Err(EngineError::InsufficientBalance {
                    required: amount,
                    available,
                })
            }
        }
    }

    /// Increase a balance by `amount`.
    ///
    /// With an `external_ref` the credit is applied at most once: repeating
    /// the call returns the original Transaction without changing the balance.
    pub async fn credit(
        &self,
        user_id: &Uuid,
        amount: i64,
        description: &str,
        external_ref: Option<&str>,
        external_payment_id: Option<&str>,
    ) -> Result<CreditOutcome, EngineError> {
        validate_amount(amount)?;

        let request = CreditRequest {
            user_id: *user_id,
            amount,
            description: description.to_string(),
            external_ref: external_ref.map(str::to_string),
            external_payment_id: external_payment_id.map(str::to_string),
        };

        let outcome = self.repo.credit(&request).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                EngineError::DuplicateExternalRef(external_ref.unwrap_or_default().to_string())
            }
            other => EngineError::Storage(other),
        })?;

        match &outcome {
            CreditOutcome::Applied(tx) => info!(
                user_id = %user_id,
                amount,
                balance = tx.resulting_balance,
                external_ref = external_ref.unwrap_or("-"),
                "Wallet credited"
            ),
            CreditOutcome::AlreadyApplied(tx) => info!(
                transaction_id = %tx.id,
                external_ref = external_ref.unwrap_or("-"),
                "Credit already applied, skipping"
            ),
        }

        Ok(outcome)
    }

    /// Transaction history for a user, most recent first.
    ///
    /// `page` is 1-based. `limit` is clamped to `1..=MAX_HISTORY_LIMIT`.
    pub async fn history(
        &self,
        user_id: &Uuid,
        page: u32,
        limit: u32,
    ) -> Result<TransactionPage, EngineError> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let offset = i64::from(page - 1) * i64::from(limit);

        let transactions = self
            .repo
            .history(user_id, i64::from(limit), offset)
            .await?;

        Ok(TransactionPage {
            transactions,
            page,
            limit,
        })
    }
}

/// Amounts moved by the ledger are strictly positive whole units.
pub fn validate_amount(amount: i64) -> Result<(), EngineError> {
    if amount <= 0 {
        return Err(EngineError::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(1).is_ok());
        assert!(matches!(
            validate_amount(0),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            validate_amount(-5),
            Err(EngineError::Validation(_))
        ));
    }
}
