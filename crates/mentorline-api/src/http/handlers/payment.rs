//! Payment reconciliation HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/payments/credit-intent - Record a pending top-up for a gateway order
//! - POST /api/v1/payments/verify        - Verify a gateway confirmation and credit the wallet
//! - GET  /api/v1/payments/stale         - Pending credits that never settled (admin)

use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use mentorline_types::error::EngineError;
use mentorline_types::wallet::Transaction;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// Request body for a credit intent.
#[derive(Debug, Deserialize)]
pub struct CreditIntentRequest {
    pub amount: i64,
    /// Order id returned by the gateway when the checkout was created.
    pub order_id: String,
}

/// Gateway confirmation forwarded by the client after checkout.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    /// Hex HMAC-SHA256 of `order_id|payment_id`.
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct SettlementResponse {
    pub transaction: Transaction,
    /// The order had already been settled; the balance did not change.
    pub replayed: bool,
}

/// POST /api/v1/payments/credit-intent
pub async fn create_credit_intent(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(body): Json<CreditIntentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Transaction>>), AppError> {
    let timer = RequestTimer::start();

    let pending = state
        .reconciler
        .create_pending_credit(&principal.user_id, body.amount, &body.order_id)
        .await?;

    let resp = timer
        .respond(pending)
        .with_link("verify", "/api/v1/payments/verify");
    Ok((StatusCode::CREATED, Json(resp)))
}

/// POST /api/v1/payments/verify
///
/// Replaying a confirmation that already settled returns the same
/// Transaction with `replayed: true`.
pub async fn verify_payment(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<VerifyPaymentRequest>,
) -> Result<Json<ApiResponse<SettlementResponse>>, AppError> {
    let timer = RequestTimer::start();
    let secret = state.payment_secret()?;

    let settlement = state
        .reconciler
        .verify_and_settle(
            &body.order_id,
            &body.payment_id,
            &body.signature,
            secret.expose_secret().as_bytes(),
        )
        .await?;

    let resp = timer
        .respond(SettlementResponse {
            transaction: settlement.transaction,
            replayed: settlement.replayed,
        })
        .with_link("balance", "/api/v1/wallet/balance");
    Ok(Json(resp))
}

/// GET /api/v1/payments/stale - Admin report of unsettled credits.
pub async fn list_stale_payments(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<ApiResponse<Vec<Transaction>>>, AppError> {
    let timer = RequestTimer::start();
    if !principal.is_admin() {
        return Err(EngineError::Forbidden("admin role required".to_string()).into());
    }

    let max_age = Duration::from_secs(state.config.pending_credit_timeout_secs);
    let stale = state.reconciler.stale_pending(max_age).await?;

    Ok(Json(timer.respond(stale)))
}
