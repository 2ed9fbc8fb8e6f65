//! Session lifecycle and the atomic charge-with-message entry point.
//!
//! `SessionManager` owns every state transition. Transitions are written as
//! compare-and-set so two racing requests cannot both move the same session.

use chrono::Utc;
use mentorline_types::error::EngineError;
use mentorline_types::identity::Principal;
use mentorline_types::message::Message;
use mentorline_types::session::{RATING_RANGE, RatingSummary, Session, SessionState};
use mentorline_types::wallet::Transaction;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ledger::validate_amount;
use crate::repository::session::{AppendOutcome, ChargeRequest};
use crate::repository::{MentorDirectory, SessionRepository};

/// Longest feedback text a student may leave.
pub const MAX_FEEDBACK_CHARS: usize = 2000;

/// Who may request a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Actor {
    Mentor,
    Participant,
}

/// Allowed transitions and the actor each requires.
fn transition_rule(from: SessionState, to: SessionState) -> Option<Actor> {
    use SessionState::*;
    match (from, to) {
        (Scheduled, Ongoing) => Some(Actor::Mentor),
        (Ongoing, Completed) => Some(Actor::Participant),
        (Scheduled, Cancelled) | (Scheduled, NoShow) => Some(Actor::Participant),
        _ => None,
    }
}

/// Whether the lifecycle allows `from -> to`.
pub fn can_transition(from: SessionState, to: SessionState) -> bool {
    transition_rule(from, to).is_some()
}

/// Manages sessions between an approved mentor and a student.
pub struct SessionManager<S: SessionRepository, D: MentorDirectory> {
    sessions: S,
    directory: D,
}

impl<S: SessionRepository, D: MentorDirectory> SessionManager<S, D> {
    pub fn new(sessions: S, directory: D) -> Self {
        Self {
            sessions,
            directory,
        }
    }

    /// Access the session repository.
    pub fn repo(&self) -> &S {
        &self.sessions
    }

    /// Access the mentor directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Book a session at the mentor's own rate from the directory.
    pub async fn book(&self, mentor_id: Uuid, student_id: Uuid) -> Result<Session, EngineError> {
        let rate = self
            .directory
            .mentor_rate(&mentor_id)
            .await?
            .ok_or(EngineError::InvalidMentor)?;
        self.create(mentor_id, student_id, rate).await
    }

    /// Create a scheduled session.
    ///
    /// The mentor must be approved in the directory and the rate positive,
    /// so every student message costs something.
    pub async fn create(
        &self,
        mentor_id: Uuid,
        student_id: Uuid,
        rate_per_unit: i64,
    ) -> Result<Session, EngineError> {
        if rate_per_unit <= 0 {
            return Err(EngineError::Validation(
                "rate_per_unit must be positive".to_string(),
            ));
        }
        if mentor_id == student_id {
            return Err(EngineError::Validation(
                "mentor and student must be different users".to_string(),
            ));
        }

        let status = self.directory.mentor_status(&mentor_id).await?;
        if !status.is_some_and(|s| s.is_active()) {
            warn!(mentor_id = %mentor_id, ?status, "Session refused for inactive mentor");
            return Err(EngineError::InvalidMentor);
        }

        let session = Session {
            id: Uuid::now_v7(),
            mentor_id,
            student_id,
            state: SessionState::Scheduled,
            rate_per_unit,
            accumulated_cost: 0,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            rating: None,
            feedback: None,
        };

        let created = self.sessions.create(&session).await?;
        info!(
            session_id = %created.id,
            mentor_id = %mentor_id,
            student_id = %student_id,
            rate_per_unit,
            "Session created"
        );
        Ok(created)
    }

    /// Get a session by ID.
    pub async fn get(&self, session_id: &Uuid) -> Result<Session, EngineError> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or(EngineError::NotFound("session"))
    }

    /// Get a session on behalf of a caller. Only participants and admins may
    /// read a session.
    pub async fn get_for(
        &self,
        session_id: &Uuid,
        principal: &Principal,
    ) -> Result<Session, EngineError> {
        let session = self.get(session_id).await?;
        ensure_can_read(&session, principal)?;
        Ok(session)
    }

    /// Sessions the user takes part in, most recent first.
    pub async fn list_for_user(
        &self,
        user_id: &Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Session>, EngineError> {
        Ok(self
            .sessions
            .list_for_user(user_id, i64::from(limit.max(1)), i64::from(offset))
            .await?)
    }

    /// Messages in a session, oldest first. Participants and admins only.
    pub async fn messages(
        &self,
        session_id: &Uuid,
        principal: &Principal,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>, EngineError> {
        let session = self.get(session_id).await?;
        ensure_can_read(&session, principal)?;
        Ok(self
            .sessions
            .get_messages(session_id, i64::from(limit.max(1)), i64::from(offset))
            .await?)
    }

    /// Mentor starts a scheduled session.
    pub async fn start(&self, session_id: &Uuid, actor_id: Uuid) -> Result<Session, EngineError> {
        self.transition(session_id, actor_id, SessionState::Scheduled, SessionState::Ongoing)
            .await
    }

    /// Either participant ends an ongoing session.
    pub async fn end(&self, session_id: &Uuid, actor_id: Uuid) -> Result<Session, EngineError> {
        self.transition(session_id, actor_id, SessionState::Ongoing, SessionState::Completed)
            .await
    }

    /// Either participant cancels a session that has not started.
    pub async fn cancel(&self, session_id: &Uuid, actor_id: Uuid) -> Result<Session, EngineError> {
        self.transition(session_id, actor_id, SessionState::Scheduled, SessionState::Cancelled)
            .await
    }

    /// Either participant records that the other side never showed up.
    pub async fn mark_no_show(
        &self,
        session_id: &Uuid,
        actor_id: Uuid,
    ) -> Result<Session, EngineError> {
        self.transition(session_id, actor_id, SessionState::Scheduled, SessionState::NoShow)
            .await
    }

    /// Student rates a completed session. A session is rated at most once.
    pub async fn rate(
        &self,
        session_id: &Uuid,
        actor_id: Uuid,
        rating: u8,
        feedback: Option<&str>,
    ) -> Result<Session, EngineError> {
        if !RATING_RANGE.contains(&rating) {
            return Err(EngineError::Validation(format!(
                "rating must be between {} and {}",
                RATING_RANGE.start(),
                RATING_RANGE.end()
            )));
        }
        let feedback = feedback.map(str::trim).filter(|f| !f.is_empty());
        if feedback.is_some_and(|f| f.chars().count() > MAX_FEEDBACK_CHARS) {
            return Err(EngineError::Validation(format!(
                "feedback must be at most {MAX_FEEDBACK_CHARS} characters"
            )));
        }

        let session = self.get(session_id).await?;
        if session.student_id != actor_id {
            return Err(EngineError::Forbidden(
                "only the student may rate a session".to_string(),
            ));
        }
        if session.state != SessionState::Completed {
            return Err(EngineError::InvalidState(format!(
                "cannot rate a {} session",
                session.state
            )));
        }

        if !self
            .sessions
            .record_feedback(session_id, rating, feedback)
            .await?
        {
            return Err(EngineError::InvalidState(
                "session has already been rated".to_string(),
            ));
        }

        info!(session_id = %session_id, mentor_id = %session.mentor_id, rating, "Session rated");
        self.get(session_id).await
    }

    /// Ratings a mentor has received across completed sessions.
    pub async fn mentor_rating(&self, mentor_id: &Uuid) -> Result<RatingSummary, EngineError> {
        Ok(self.sessions.rating_summary(mentor_id).await?)
    }

    async fn transition(
        &self,
        session_id: &Uuid,
        actor_id: Uuid,
        from: SessionState,
        to: SessionState,
    ) -> Result<Session, EngineError> {
        let session = self.get(session_id).await?;

        let allowed = match transition_rule(from, to) {
            Some(Actor::Mentor) => session.mentor_id == actor_id,
            Some(Actor::Participant) => session.is_participant(actor_id),
            None => false,
        };
        if !allowed {
            return Err(EngineError::Forbidden(format!(
                "user may not move this session to {to}"
            )));
        }

        if session.state != from {
            return Err(EngineError::InvalidState(format!(
                "cannot move session from {} to {to}",
                session.state
            )));
        }

        if !self
            .sessions
            .transition(session_id, from, to, Utc::now())
            .await?
        {
            // Lost the race against a concurrent transition.
            let current = self.get(session_id).await?;
            return Err(EngineError::InvalidState(format!(
                "cannot move session from {} to {to}",
                current.state
            )));
        }

        info!(session_id = %session_id, from = %from, to = %to, "Session transitioned");
        self.get(session_id).await
    }

    /// Persist a message and, when `charge` is given, debit its payer in the
    /// same atomic step.
    ///
    /// Nothing is written if the session is no longer open or the payer's
    /// balance is below the charge.
    pub async fn charge_if_open(
        &self,
        message: &Message,
        charge: Option<&ChargeRequest>,
    ) -> Result<(Message, Option<Transaction>), EngineError> {
        if let Some(charge) = charge {
            validate_amount(charge.amount)?;
        }

        match self.sessions.append_message(message, charge).await? {
            AppendOutcome::Appended {
                message,
                transaction,
            } => {
                if let Some(debit) = &transaction {
                    info!(
                        user_id = %debit.user_id,
                        session_id = %message.session_id,
                        amount = debit.amount,
                        balance = ?debit.resulting_balance,
                        "Wallet debited"
                    );
                }
                Ok((message, transaction))
            }
            AppendOutcome::InsufficientBalance { available } => {
                Err(EngineError::InsufficientBalance {
                    required: charge.map(|c| c.amount).unwrap_or_default(),
                    available,
                })
            }
            AppendOutcome::SessionClosed(state) => {
                info!(session_id = %message.session_id, state = %state, "Message refused on closed session");
                Err(EngineError::SessionClosed)
            }
            AppendOutcome::SessionNotFound => Err(EngineError::NotFound("session")),
        }
    }
}

fn ensure_can_read(session: &Session, principal: &Principal) -> Result<(), EngineError> {
    if principal.is_admin() || session.is_participant(principal.user_id) {
        Ok(())
    } else {
        Err(EngineError::Forbidden(
            "only participants may access this session".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    #[test]
    fn test_allowed_transitions() {
        assert!(can_transition(Scheduled, Ongoing));
        assert!(can_transition(Ongoing, Completed));
        assert!(can_transition(Scheduled, Cancelled));
        assert!(can_transition(Scheduled, NoShow));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for from in [Completed, Cancelled, NoShow] {
            for to in [Scheduled, Ongoing, Completed, Cancelled, NoShow] {
                assert!(!can_transition(from, to), "{from} -> {to} must be refused");
            }
        }
    }

    #[test]
    fn test_ongoing_cannot_be_cancelled() {
        assert!(!can_transition(Ongoing, Cancelled));
        assert!(!can_transition(Ongoing, NoShow));
        assert!(!can_transition(Scheduled, Completed));
    }

    #[test]
    fn test_only_mentor_starts() {
        assert_eq!(transition_rule(Scheduled, Ongoing), Some(Actor::Mentor));
        assert_eq!(transition_rule(Ongoing, Completed), Some(Actor::Participant));
    }
}
