//! Mentor presence HTTP handlers.
//!
//! Endpoints:
//! - PUT /api/v1/presence              - Mentor sets own availability
//! - GET /api/v1/presence/{mentor_id}  - Current availability of a mentor

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use mentorline_types::identity::Role;
use mentorline_types::presence::PresenceRecord;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetPresenceRequest {
    pub is_online: bool,
}

/// PUT /api/v1/presence
pub async fn set_presence(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(body): Json<SetPresenceRequest>,
) -> Result<Json<ApiResponse<PresenceRecord>>, AppError> {
    let timer = RequestTimer::start();
    auth.require_role(Role::Mentor)?;

    let record = state
        .presence
        .set_presence(&auth.0.user_id, body.is_online)
        .await?;

    Ok(Json(timer.respond(record)))
}

/// GET /api/v1/presence/{mentor_id}
pub async fn get_presence(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(mentor_id): Path<Uuid>,
) -> Result<Json<ApiResponse<PresenceRecord>>, AppError> {
    let timer = RequestTimer::start();
    let record = state.presence.get(&mentor_id).await?;
    Ok(Json(timer.respond(record)))
}
