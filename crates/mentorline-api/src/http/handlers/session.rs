//! Session lifecycle HTTP handlers.
//!
//! Endpoints:
//! - POST /api/v1/sessions                - Book a session with a mentor
//! - GET  /api/v1/sessions                - List the caller's sessions
//! - GET  /api/v1/sessions/{id}           - Get a single session
//! - POST /api/v1/sessions/{id}/start     - Mentor starts the session
//! - POST /api/v1/sessions/{id}/end       - Either participant ends it
//! - POST /api/v1/sessions/{id}/cancel    - Cancel before it starts
//! - POST /api/v1/sessions/{id}/no-show   - Record a no-show
//! - POST /api/v1/sessions/{id}/feedback  - Student rates a completed session

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use mentorline_infra::config::resolve_page_size;
use mentorline_types::error::EngineError;
use mentorline_types::identity::Role;
use mentorline_types::session::Session;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::query::PageQuery;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// Request body for booking a session. The rate always comes from the
/// mentor directory.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub mentor_id: Uuid,
    /// Defaults to the caller. Only admins may book on behalf of someone else.
    pub student_id: Option<Uuid>,
}

/// Request body for rating a completed session.
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub rating: u8,
    pub feedback: Option<String>,
}

fn session_response(timer: RequestTimer, session: Session) -> ApiResponse<Session> {
    let id = session.id;
    timer
        .respond(session)
        .with_link("self", &format!("/api/v1/sessions/{id}"))
        .with_link("messages", &format!("/api/v1/sessions/{id}/messages"))
}

/// POST /api/v1/sessions - Book a session.
pub async fn create_session(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Session>>), AppError> {
    let timer = RequestTimer::start();

    let student_id = match body.student_id {
        Some(id) if id != principal.user_id && !principal.is_admin() => {
            return Err(EngineError::Forbidden(
                "only admins may book sessions for another student".to_string(),
            )
            .into());
        }
        Some(id) => id,
        None if principal.role == Role::Student => principal.user_id,
        None => {
            return Err(AppError::Validation(
                "student_id is required when not booking as a student".to_string(),
            ));
        }
    };

    let session = state.sessions.book(body.mentor_id, student_id).await?;

    Ok((StatusCode::CREATED, Json(session_response(timer, session))))
}

/// GET /api/v1/sessions - Sessions the caller takes part in, most recent first.
pub async fn list_sessions(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<Session>>>, AppError> {
    let timer = RequestTimer::start();

    let limit = resolve_page_size(&state.config, query.limit);
    let sessions = state
        .sessions
        .list_for_user(&principal.user_id, limit, query.offset)
        .await?;

    Ok(Json(timer.respond(sessions).with_link("self", "/api/v1/sessions")))
}

/// GET /api/v1/sessions/{id} - Get a session by ID.
pub async fn get_session(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let timer = RequestTimer::start();
    let session = state.sessions.get_for(&session_id, &principal).await?;
    Ok(Json(session_response(timer, session)))
}

/// POST /api/v1/sessions/{id}/start - Mentor starts a scheduled session.
pub async fn start_session(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let timer = RequestTimer::start();
    let session = state.sessions.start(&session_id, principal.user_id).await?;
    Ok(Json(session_response(timer, session)))
}

/// POST /api/v1/sessions/{id}/end - Either participant ends an ongoing session.
pub async fn end_session(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let timer = RequestTimer::start();
    let session = state.sessions.end(&session_id, principal.user_id).await?;
    Ok(Json(session_response(timer, session)))
}

/// POST /api/v1/sessions/{id}/cancel
pub async fn cancel_session(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let timer = RequestTimer::start();
    let session = state.sessions.cancel(&session_id, principal.user_id).await?;
    Ok(Json(session_response(timer, session)))
}

/// POST /api/v1/sessions/{id}/no-show
pub async fn no_show_session(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let timer = RequestTimer::start();
    let session = state
        .sessions
        .mark_no_show(&session_id, principal.user_id)
        .await?;
    Ok(Json(session_response(timer, session)))
}

/// POST /api/v1/sessions/{id}/feedback
pub async fn submit_feedback(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Path(session_id): Path<Uuid>,
    Json(body): Json<FeedbackRequest>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let timer = RequestTimer::start();
    let session = state
        .sessions
        .rate(
            &session_id,
            principal.user_id,
            body.rating,
            body.feedback.as_deref(),
        )
        .await?;
    Ok(Json(session_response(timer, session)))
}
