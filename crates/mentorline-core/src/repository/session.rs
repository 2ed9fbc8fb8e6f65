//! SessionRepository trait definition.
//!
//! Provides persistence for sessions and their messages. Follows the same
//! RPITIT pattern as the other repositories.

use chrono::{DateTime, Utc};
use mentorline_types::error::RepositoryError;
use mentorline_types::message::Message;
use mentorline_types::session::{RatingSummary, Session, SessionState};
use mentorline_types::wallet::Transaction;
use uuid::Uuid;

/// A wallet debit to apply together with a message insert.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub payer_id: Uuid,
    pub amount: i64,
    pub description: String,
}

/// Result of appending a message to a session.
#[derive(Debug, Clone)]
pub enum AppendOutcome {
    /// The message was persisted. When a charge was requested, the debit,
    /// the session's accumulated cost and the message were written together
    /// and `transaction` holds the debit.
    Appended {
        message: Message,
        transaction: Option<Transaction>,
    },
    /// The payer's balance was below the charge. Nothing was written.
    InsufficientBalance { available: i64 },
    /// The session is no longer open. Nothing was written.
    SessionClosed(SessionState),
    /// The session does not exist. Nothing was written.
    SessionNotFound,
}

/// Repository trait for session and message persistence.
///
/// Implementations live in mentorline-infra (e.g., `SqliteSessionRepository`).
pub trait SessionRepository: Send + Sync {
    /// Create a new session.
    fn create(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<Session, RepositoryError>> + Send;

    /// Get a session by its unique ID.
    fn get(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Session>, RepositoryError>> + Send;

    /// Sessions in which `user_id` is mentor or student, most recent first.
    fn list_for_user(
        &self,
        user_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Session>, RepositoryError>> + Send;

    /// Compare-and-set the session state from `from` to `to`.
    ///
    /// Records `started_at = at` when moving to `Ongoing` and `ended_at = at`
    /// when moving to a terminal state. Returns `false` without writing if the
    /// stored state was not `from`.
    fn transition(
        &self,
        session_id: &Uuid,
        from: SessionState,
        to: SessionState,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Persist a message, optionally charging its sender first.
    ///
    /// The session must still be open at write time. With a charge, the
    /// wallet debit, the Transaction row, the session's accumulated cost and
    /// the message insert all commit together or not at all.
    fn append_message(
        &self,
        message: &Message,
        charge: Option<&ChargeRequest>,
    ) -> impl std::future::Future<Output = Result<AppendOutcome, RepositoryError>> + Send;

    /// Messages in a session, oldest first.
    fn get_messages(
        &self,
        session_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Store the student's rating and feedback on a completed session.
    ///
    /// Returns `false` without writing if the session is not `Completed` or
    /// already carries a rating.
    fn record_feedback(
        &self,
        session_id: &Uuid,
        rating: u8,
        feedback: Option<&str>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Count and mean of the ratings across a mentor's sessions.
    fn rating_summary(
        &self,
        mentor_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<RatingSummary, RepositoryError>> + Send;
}
