//! SQLite session repository implementation.
//!
//! Implements `SessionRepository` from `mentorline-core`. Message appends that
//! carry a charge run the wallet debit, the session cost update and the
//! message insert in one writer transaction.

use chrono::{DateTime, Utc};
use mentorline_core::repository::SessionRepository;
use mentorline_core::repository::ledger::DebitOutcome;
use mentorline_core::repository::session::{AppendOutcome, ChargeRequest};
use mentorline_types::error::RepositoryError;
use mentorline_types::message::{AttachmentMeta, Message, MessagePayload};
use mentorline_types::session::{RatingSummary, Session, SessionState};
use sqlx::Row;
use uuid::Uuid;

use super::ledger::debit_in_tx;
use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_err};

/// SQLite-backed implementation of `SessionRepository`.
#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct SessionRow {
    id: String,
    mentor_id: String,
    student_id: String,
    state: String,
    rate_per_unit: i64,
    accumulated_cost: i64,
    created_at: String,
    started_at: Option<String>,
    ended_at: Option<String>,
    rating: Option<i64>,
    feedback: Option<String>,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            mentor_id: row.try_get("mentor_id")?,
            student_id: row.try_get("student_id")?,
            state: row.try_get("state")?,
            rate_per_unit: row.try_get("rate_per_unit")?,
            accumulated_cost: row.try_get("accumulated_cost")?,
            created_at: row.try_get("created_at")?,
            started_at: row.try_get("started_at")?,
            ended_at: row.try_get("ended_at")?,
            rating: row.try_get("rating")?,
            feedback: row.try_get("feedback")?,
        })
    }

    fn into_session(self) -> Result<Session, RepositoryError> {
        let state: SessionState = self
            .state
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Session {
            id: parse_uuid(&self.id, "session id")?,
            mentor_id: parse_uuid(&self.mentor_id, "mentor_id")?,
            student_id: parse_uuid(&self.student_id, "student_id")?,
            state,
            rate_per_unit: self.rate_per_unit,
            accumulated_cost: self.accumulated_cost,
            created_at: parse_datetime(&self.created_at)?,
            started_at: self.started_at.as_deref().map(parse_datetime).transpose()?,
            ended_at: self.ended_at.as_deref().map(parse_datetime).transpose()?,
            rating: self
                .rating
                .map(|r| {
                    u8::try_from(r)
                        .map_err(|_| RepositoryError::Query(format!("invalid rating: {r}")))
                })
                .transpose()?,
            feedback: self.feedback,
        })
    }
}

struct MessageRow {
    id: String,
    session_id: String,
    sender_id: String,
    kind: String,
    content: Option<String>,
    file_name: Option<String>,
    byte_size: Option<i64>,
    url: Option<String>,
    mime_type: Option<String>,
    cost: i64,
    transaction_id: Option<String>,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            sender_id: row.try_get("sender_id")?,
            kind: row.try_get("kind")?,
            content: row.try_get("content")?,
            file_name: row.try_get("file_name")?,
            byte_size: row.try_get("byte_size")?,
            url: row.try_get("url")?,
            mime_type: row.try_get("mime_type")?,
            cost: row.try_get("cost")?,
            transaction_id: row.try_get("transaction_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let payload = match self.kind.as_str() {
            "text" => MessagePayload::Text {
                content: self.content.unwrap_or_default(),
            },
            "attachment" => MessagePayload::Attachment(AttachmentMeta {
                file_name: self.file_name.unwrap_or_default(),
                byte_size: self.byte_size.unwrap_or_default().max(0) as u64,
                url: self.url.unwrap_or_default(),
                mime_type: self.mime_type.unwrap_or_default(),
            }),
            other => {
                return Err(RepositoryError::Query(format!(
                    "invalid message kind: '{other}'"
                )));
            }
        };

        Ok(Message {
            id: parse_uuid(&self.id, "message id")?,
            session_id: parse_uuid(&self.session_id, "session_id")?,
            sender_id: parse_uuid(&self.sender_id, "sender_id")?,
            payload,
            cost: self.cost,
            transaction_id: self
                .transaction_id
                .as_deref()
                .map(|id| parse_uuid(id, "transaction_id"))
                .transpose()?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// SessionRepository implementation
// ---------------------------------------------------------------------------

impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO sessions (id, mentor_id, student_id, state, rate_per_unit, accumulated_cost, created_at, started_at, ended_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(session.id.to_string())
        .bind(session.mentor_id.to_string())
        .bind(session.student_id.to_string())
        .bind(session.state.as_str())
        .bind(session.rate_per_unit)
        .bind(session.accumulated_cost)
        .bind(format_datetime(&session.created_at))
        .bind(session.started_at.as_ref().map(format_datetime))
        .bind(session.ended_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(session.clone())
    }

    async fn get(&self, session_id: &Uuid) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = ?")
            .bind(session_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => {
                let session_row = SessionRow::from_row(&row).map_err(query_err)?;
                Ok(Some(session_row.into_session()?))
            }
            None => Ok(None),
        }
    }

    async fn list_for_user(
        &self,
        user_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Session>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM sessions WHERE mentor_id = ?1 OR student_id = ?1
               ORDER BY created_at DESC, rowid DESC
               LIMIT ?2 OFFSET ?3"#,
        )
        .bind(user_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter()
            .map(|row| {
                SessionRow::from_row(row)
                    .map_err(query_err)?
                    .into_session()
            })
            .collect()
    }

    async fn transition(
        &self,
        session_id: &Uuid,
        from: SessionState,
        to: SessionState,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let at = format_datetime(&at);
        let started_at = (to == SessionState::Ongoing).then(|| at.clone());
        let ended_at = to.is_terminal().then_some(at);

        let result = sqlx::query(
            r#"UPDATE sessions
               SET state = ?,
                   started_at = COALESCE(?, started_at),
                   ended_at = COALESCE(?, ended_at)
               WHERE id = ? AND state = ?"#,
        )
        .bind(to.as_str())
        .bind(started_at)
        .bind(ended_at)
        .bind(session_id.to_string())
        .bind(from.as_str())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn append_message(
        &self,
        message: &Message,
        charge: Option<&ChargeRequest>,
    ) -> Result<AppendOutcome, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        // Read the state on the writer connection so no transition can slip
        // in between this check and the commit.
        let state: Option<String> = sqlx::query_scalar("SELECT state FROM sessions WHERE id = ?")
            .bind(message.session_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(query_err)?;
        let Some(state) = state else {
            return Ok(AppendOutcome::SessionNotFound);
        };
        let state: SessionState = state.parse().map_err(|e: String| RepositoryError::Query(e))?;
        if !state.is_open() {
            return Ok(AppendOutcome::SessionClosed(state));
        }

        let mut message = message.clone();
        let transaction = match charge {
            Some(charge) => match debit_in_tx(&mut tx, &charge.payer_id, charge.amount, &charge.description).await? {
                DebitOutcome::Debited(debit) => {
                    sqlx::query(
                        "UPDATE sessions SET accumulated_cost = accumulated_cost + ? WHERE id = ?",
                    )
                    .bind(charge.amount)
                    .bind(message.session_id.to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(query_err)?;

                    message.cost = charge.amount;
                    message.transaction_id = Some(debit.id);
                    Some(debit)
                }
                DebitOutcome::Insufficient { available } => {
                    return Ok(AppendOutcome::InsufficientBalance { available });
                }
            },
            None => {
                message.cost = 0;
                message.transaction_id = None;
                None
            }
        };

        let (content, attachment) = match &message.payload {
            MessagePayload::Text { content } => (Some(content.as_str()), None),
            MessagePayload::Attachment(meta) => (None, Some(meta)),
        };

        sqlx::query(
            r#"INSERT INTO messages (id, session_id, sender_id, kind, content, file_name, byte_size, url, mime_type, cost, transaction_id, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.session_id.to_string())
        .bind(message.sender_id.to_string())
        .bind(message.payload.kind())
        .bind(content)
        .bind(attachment.map(|m| m.file_name.as_str()))
        .bind(attachment.map(|m| m.byte_size as i64))
        .bind(attachment.map(|m| m.url.as_str()))
        .bind(attachment.map(|m| m.mime_type.as_str()))
        .bind(message.cost)
        .bind(message.transaction_id.map(|id| id.to_string()))
        .bind(format_datetime(&message.created_at))
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;

        Ok(AppendOutcome::Appended {
            message,
            transaction,
        })
    }

    async fn get_messages(
        &self,
        session_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM messages WHERE session_id = ?
               ORDER BY created_at ASC, rowid ASC
               LIMIT ? OFFSET ?"#,
        )
        .bind(session_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter()
            .map(|row| {
                MessageRow::from_row(row)
                    .map_err(query_err)?
                    .into_message()
            })
            .collect()
    }

    async fn record_feedback(
        &self,
        session_id: &Uuid,
        rating: u8,
        feedback: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE sessions SET rating = ?, feedback = ?
               WHERE id = ? AND state = 'completed' AND rating IS NULL"#,
        )
        .bind(i64::from(rating))
        .bind(feedback)
        .bind(session_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn rating_summary(&self, mentor_id: &Uuid) -> Result<RatingSummary, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT COUNT(rating) AS count, AVG(rating) AS average
               FROM sessions WHERE mentor_id = ?"#,
        )
        .bind(mentor_id.to_string())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(query_err)?;

        Ok(RatingSummary {
            count: row.try_get("count").map_err(query_err)?,
            average: row.try_get("average").map_err(query_err)?,
        })
    }
}
