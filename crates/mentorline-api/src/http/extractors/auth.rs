//! Bearer token authentication extractor.
//!
//! Reads the token from:
//! - `Authorization: Bearer <token>` header
//! - `?token=<token>` query parameter (browsers cannot set headers on a
//!   WebSocket handshake)
//!
//! A valid token becomes the request's [`Principal`].

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use mentorline_types::error::EngineError;
use mentorline_types::identity::{Principal, Role};

use crate::auth::validate_token;
use crate::http::error::AppError;
use crate::state::AppState;

/// Authenticated caller. Extracting this validates the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Principal);

impl Authenticated {
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.0.role == role {
            Ok(())
        } else {
            Err(AppError::Engine(EngineError::Forbidden(format!(
                "{role} role required"
            ))))
        }
    }
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;

        let claims = validate_token(&token, state.jwt()?).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::Unauthorized("Invalid or expired token".to_string())
        })?;

        Ok(Authenticated(Principal::from(&claims)))
    }
}

/// Extract the bearer token from the request.
pub fn extract_token(parts: &Parts) -> Result<String, AppError> {
    if let Some(auth) = parts.headers.get("authorization") {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(token.trim().to_string());
        }
    }

    if let Ok(Query(TokenQuery { token: Some(token) })) = Query::try_from_uri(&parts.uri) {
        if !token.is_empty() {
            return Ok(token);
        }
    }

    Err(AppError::Unauthorized(
        "Missing token. Provide via 'Authorization: Bearer <token>' header or 'token' query parameter."
            .to_string(),
    ))
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}
