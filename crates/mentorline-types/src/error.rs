use thiserror::Error;

/// Errors surfaced by the metered conversation engine.
///
/// Every variant is terminal for the call that produced it; nothing here is
/// retried automatically. `InsufficientBalance` is kept distinct so callers
/// can prompt the user to top up their wallet.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("mentor is not active")]
    InvalidMentor,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("session is closed")]
    SessionClosed,

    #[error("invalid payment signature")]
    InvalidSignature,

    #[error("external reference '{0}' already exists")]
    DuplicateExternalRef(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl EngineError {
    /// Whether this error should prompt the client to top up the wallet.
    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self, EngineError::InsufficientBalance { .. })
    }
}

/// Errors from repository operations (used by trait definitions in mentorline-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_balance_display() {
        let err = EngineError::InsufficientBalance {
            required: 10,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "insufficient balance: required 10, available 3"
        );
        assert!(err.is_insufficient_balance());
    }

    #[test]
    fn test_other_errors_are_not_top_up_prompts() {
        assert!(!EngineError::SessionClosed.is_insufficient_balance());
        assert!(!EngineError::InvalidSignature.is_insufficient_balance());
        assert!(!EngineError::NotFound("session").is_insufficient_balance());
    }

    #[test]
    fn test_repository_error_converts() {
        let err: EngineError = RepositoryError::Query("syntax error".to_string()).into();
        assert_eq!(err.to_string(), "storage error: query error: syntax error");
    }
}
