//! Wallet HTTP handlers.
//!
//! Endpoints:
//! - GET  /api/v1/wallet/balance      - Caller's balance
//! - GET  /api/v1/wallet/transactions - Caller's ledger, most recent first
//! - POST /api/v1/wallet/deduct       - Direct debit for the surrounding application

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mentorline_types::error::EngineError;
use mentorline_types::wallet::{Transaction, TransactionPage};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::query::HistoryQuery;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: Uuid,
    pub balance: i64,
}

/// Request body for a direct deduction.
#[derive(Debug, Deserialize)]
pub struct DeductRequest {
    pub amount: i64,
    pub description: String,
    /// Wallet to charge. Defaults to the caller; only admins may charge others.
    pub user_id: Option<Uuid>,
}

/// GET /api/v1/wallet/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
) -> Result<Json<ApiResponse<BalanceResponse>>, AppError> {
    let timer = RequestTimer::start();

    let balance = state.ledger.balance(&principal.user_id).await?;

    let resp = timer
        .respond(BalanceResponse {
            user_id: principal.user_id,
            balance,
        })
        .with_link("transactions", "/api/v1/wallet/transactions");
    Ok(Json(resp))
}

/// GET /api/v1/wallet/transactions?page=&limit=
pub async fn list_transactions(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<TransactionPage>>, AppError> {
    let timer = RequestTimer::start();

    let page = state
        .ledger
        .history(&principal.user_id, query.page, query.limit)
        .await?;

    let next = format!(
        "/api/v1/wallet/transactions?page={}&limit={}",
        page.page + 1,
        page.limit
    );
    Ok(Json(timer.respond(page).with_link("next", &next)))
}

/// POST /api/v1/wallet/deduct
pub async fn deduct(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(body): Json<DeductRequest>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    let timer = RequestTimer::start();

    let user_id = match body.user_id {
        Some(id) if id != principal.user_id && !principal.is_admin() => {
            return Err(EngineError::Forbidden(
                "only admins may charge another wallet".to_string(),
            )
            .into());
        }
        Some(id) => id,
        None => principal.user_id,
    };

    let tx = state
        .ledger
        .debit(&user_id, body.amount, &body.description)
        .await?;

    Ok(Json(
        timer
            .respond(tx)
            .with_link("balance", "/api/v1/wallet/balance"),
    ))
}
