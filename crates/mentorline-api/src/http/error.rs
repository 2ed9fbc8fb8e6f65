//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use mentorline_types::error::EngineError;
use uuid::Uuid;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors raised by the engine services.
    Engine(EngineError),
    /// Authentication failure.
    Unauthorized(String),
    /// Validation error raised before reaching the engine.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        AppError::Engine(e)
    }
}

impl AppError {
    /// Status, machine-readable code and message for this error.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Engine(e @ EngineError::InsufficientBalance { .. }) => {
                (StatusCode::PAYMENT_REQUIRED, "INSUFFICIENT_BALANCE", e.to_string())
            }
            AppError::Engine(e @ EngineError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
            }
            AppError::Engine(e @ EngineError::Forbidden(_)) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
            }
            AppError::Engine(EngineError::InvalidState(msg)) => {
                (StatusCode::CONFLICT, "INVALID_STATE", msg.clone())
            }
            AppError::Engine(e @ EngineError::SessionClosed) => {
                (StatusCode::CONFLICT, "SESSION_CLOSED", e.to_string())
            }
            AppError::Engine(e @ EngineError::InvalidMentor) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_MENTOR", e.to_string())
            }
            AppError::Engine(e @ EngineError::InvalidSignature) => {
                (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE", e.to_string())
            }
            AppError::Engine(e @ EngineError::DuplicateExternalRef(_)) => {
                (StatusCode::CONFLICT, "DUPLICATE_EXTERNAL_REF", e.to_string())
            }
            AppError::Engine(EngineError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Engine(EngineError::Storage(e)) => {
                tracing::error!(error = %e, "Storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal storage error".to_string(),
                )
            }
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let details = match &self {
            AppError::Engine(EngineError::InsufficientBalance {
                required,
                available,
            }) => Some(json!({
                "required": required,
                "available": available,
            })),
            _ => None,
        };

        let body = ApiResponse::error(code, &message, details, Uuid::now_v7().to_string(), 0);
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentorline_types::error::RepositoryError;

    #[test]
    fn test_insufficient_balance_is_payment_required() {
        let err = AppError::from(EngineError::InsufficientBalance {
            required: 10,
            available: 4,
        });
        let (status, code, _) = err.parts();
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(code, "INSUFFICIENT_BALANCE");
    }

    #[test]
    fn test_domain_errors_have_distinct_codes() {
        let cases = [
            (EngineError::NotFound("session"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (EngineError::Forbidden("x".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (EngineError::InvalidState("x".into()), StatusCode::CONFLICT, "INVALID_STATE"),
            (EngineError::SessionClosed, StatusCode::CONFLICT, "SESSION_CLOSED"),
            (EngineError::InvalidSignature, StatusCode::BAD_REQUEST, "INVALID_SIGNATURE"),
            (
                EngineError::DuplicateExternalRef("order_1".into()),
                StatusCode::CONFLICT,
                "DUPLICATE_EXTERNAL_REF",
            ),
        ];
        for (err, status, code) in cases {
            let (s, c, _) = AppError::from(err).parts();
            assert_eq!(s, status);
            assert_eq!(c, code);
        }
    }

    #[test]
    fn test_storage_error_hides_details() {
        let err = AppError::from(EngineError::Storage(RepositoryError::Query(
            "no such table: wallets".to_string(),
        )));
        let (status, code, message) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "INTERNAL_ERROR");
        assert!(!message.contains("wallets"));
    }

    #[test]
    fn test_response_status() {
        let resp = AppError::Unauthorized("missing token".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_insufficient_balance_body_is_envelope_with_details() {
        let resp = AppError::from(EngineError::InsufficientBalance {
            required: 10,
            available: 4,
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["errors"][0]["code"], "INSUFFICIENT_BALANCE");
        assert_eq!(json["errors"][0]["details"]["required"], 10);
        assert_eq!(json["errors"][0]["details"]["available"], 4);
        assert!(!json["meta"]["request_id"].as_str().unwrap().is_empty());
    }
}
