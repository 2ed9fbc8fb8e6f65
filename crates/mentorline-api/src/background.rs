//! Periodic report of pending credits that never settled.
//!
//! A pending credit older than `pending_credit_timeout_secs` usually means the
//! gateway confirmation was lost. Nothing is cancelled; each stale credit is
//! logged at `warn` for an operator to reconcile by hand.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use mentorline_types::config::EngineConfig;

use crate::state::ConcreteReconciler;

/// Run the stale pending-credit scan until `cancel` is triggered.
pub async fn run_stale_scan(
    reconciler: Arc<ConcreteReconciler>,
    config: Arc<EngineConfig>,
    cancel: CancellationToken,
) {
    let max_age = Duration::from_secs(config.pending_credit_timeout_secs);
    let every = Duration::from_secs(config.stale_scan_interval_secs.max(1));

    tracing::info!(
        max_age_secs = max_age.as_secs(),
        interval_secs = every.as_secs(),
        "Stale payment scan started"
    );

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Stale payment scan stopping");
                break;
            }
            _ = interval.tick() => {
                scan_once(&reconciler, max_age).await;
            }
        }
    }
}

/// One pass of the scan. Returns how many stale credits were reported.
pub async fn scan_once(reconciler: &ConcreteReconciler, max_age: Duration) -> usize {
    match reconciler.stale_pending(max_age).await {
        Ok(stale) if stale.is_empty() => {
            tracing::debug!("Stale payment scan: nothing pending");
            0
        }
        Ok(stale) => {
            for tx in &stale {
                tracing::warn!(
                    transaction_id = %tx.id,
                    user_id = %tx.user_id,
                    amount = tx.amount,
                    order_id = tx.external_ref.as_deref().unwrap_or("-"),
                    created_at = %tx.created_at,
                    "Pending credit never settled"
                );
            }
            stale.len()
        }
        Err(e) => {
            tracing::error!(error = %e, "Stale payment scan failed");
            0
        }
    }
}
