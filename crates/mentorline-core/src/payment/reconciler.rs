//! Converts signed gateway confirmations into wallet credits.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mentorline_types::error::{EngineError, RepositoryError};
use mentorline_types::wallet::{Transaction, TransactionKind, TransactionStatus};
use tracing::{info, warn};
use uuid::Uuid;

use crate::ledger::{Ledger, validate_amount};
use crate::payment::signature::verify_payment_signature;
use crate::repository::LedgerRepository;

/// Outcome of a successful settlement.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub transaction: Transaction,
    /// `true` when the confirmation had already been settled earlier and this
    /// call changed nothing.
    pub replayed: bool,
}

/// Records gateway orders as pending credits and settles them once the
/// client presents a valid signature.
pub struct PaymentReconciler<R: LedgerRepository> {
    ledger: Arc<Ledger<R>>,
}

impl<R: LedgerRepository> PaymentReconciler<R> {
    pub fn new(ledger: Arc<Ledger<R>>) -> Self {
        Self { ledger }
    }

    /// Record a pending credit bound to a gateway order id.
    ///
    /// Does not change any balance. Fails with `DuplicateExternalRef` if the
    /// order id is already known.
    pub async fn create_pending_credit(
        &self,
        user_id: &Uuid,
        amount: i64,
        external_order_id: &str,
    ) -> Result<Transaction, EngineError> {
        validate_amount(amount)?;
        let order_id = external_order_id;
        if order_id.is_empty() {
            return Err(EngineError::Validation("order id is required".to_string()));
        }
        // Stored verbatim; settlement looks the id up and signs it unchanged.
        if order_id.trim() != order_id {
            return Err(EngineError::Validation(
                "order id must not have surrounding whitespace".to_string(),
            ));
        }

        let pending = Transaction {
            id: Uuid::now_v7(),
            user_id: *user_id,
            kind: TransactionKind::Credit,
            amount,
            resulting_balance: None,
            description: "Wallet top-up".to_string(),
            external_ref: Some(order_id.to_string()),
            external_payment_id: None,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        };

        let created = self
            .ledger
            .repo()
            .insert_pending(&pending)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    EngineError::DuplicateExternalRef(order_id.to_string())
                }
                other => EngineError::Storage(other),
            })?;

        info!(
            user_id = %user_id,
            amount,
            order_id,
            "Pending credit recorded"
        );
        Ok(created)
    }

    /// Verify a gateway confirmation and credit the wallet.
    ///
    /// The credit is applied at most once per order id: replaying a valid
    /// confirmation returns the settled Transaction with `replayed = true`.
    /// A bad signature marks a still-pending credit as failed and returns
    /// `InvalidSignature`.
    pub async fn verify_and_settle(
        &self,
        external_order_id: &str,
        external_payment_id: &str,
        signature: &str,
        expected_secret: &[u8],
    ) -> Result<Settlement, EngineError> {
        let repo = self.ledger.repo();
        let pending = repo
            .find_by_external_ref(external_order_id)
            .await?
            .ok_or(EngineError::NotFound("payment order"))?;

        if !verify_payment_signature(
            external_order_id,
            external_payment_id,
            signature,
            expected_secret,
        ) {
            if pending.status == TransactionStatus::Pending {
                repo.mark_failed(external_order_id).await?;
            }
            warn!(
                order_id = external_order_id,
                user_id = %pending.user_id,
                "Payment signature mismatch"
            );
            return Err(EngineError::InvalidSignature);
        }

        if pending.status == TransactionStatus::Failed {
            return Err(EngineError::InvalidState(format!(
                "payment order '{external_order_id}' has failed"
            )));
        }

        let outcome = self
            .ledger
            .credit(
                &pending.user_id,
                pending.amount,
                &pending.description,
                Some(external_order_id),
                Some(external_payment_id),
            )
            .await?;

        let replayed = !outcome.was_applied();
        Ok(Settlement {
            transaction: outcome.into_transaction(),
            replayed,
        })
    }

    /// Pending credits older than `older_than`, oldest first.
    ///
    /// These are reported for operator review only; nothing is cancelled.
    pub async fn stale_pending(&self, older_than: Duration) -> Result<Vec<Transaction>, EngineError> {
        let age = chrono::Duration::from_std(older_than)
            .map_err(|e| EngineError::Validation(format!("invalid age: {e}")))?;
        let cutoff = Utc::now() - age;
        Ok(self.ledger.repo().pending_before(cutoff).await?)
    }
}
