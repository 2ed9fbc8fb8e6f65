//! Metered message HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/sessions/{id}/messages - Send a text or attachment message
//! - GET  /api/v1/sessions/{id}/messages - Session history, oldest first

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use uuid::Uuid;

use mentorline_infra::config::resolve_page_size;
use mentorline_types::message::{Message, MessagePayload};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::query::PageQuery;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// POST /api/v1/sessions/{id}/messages - Price, charge and deliver a message.
///
/// The body is a tagged payload:
/// `{"kind":"text","content":"..."}` or
/// `{"kind":"attachment","file_name":"..","byte_size":..,"url":"..","mime_type":".."}`.
/// A student without enough balance gets 402 `INSUFFICIENT_BALANCE`.
pub async fn send_message(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<MessagePayload>,
) -> Result<(StatusCode, Json<ApiResponse<Message>>), AppError> {
    let timer = RequestTimer::start();

    let message = state
        .metering
        .submit(&session_id, principal.user_id, payload)
        .await?;

    let resp = timer
        .respond(message)
        .with_link("session", &format!("/api/v1/sessions/{session_id}"));
    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/v1/sessions/{id}/messages - Messages for reconnecting clients.
pub async fn list_messages(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(session_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<Message>>>, AppError> {
    let timer = RequestTimer::start();

    let limit = resolve_page_size(&state.config, query.limit);
    let messages = state
        .sessions
        .messages(&session_id, &principal, limit, query.offset)
        .await?;

    let resp = timer.respond(messages).with_link(
        "self",
        &format!("/api/v1/sessions/{session_id}/messages"),
    );
    Ok(Json(resp))
}
