//! Metering engine: prices each inbound message and charges the student.
//!
//! Pricing is block-based. Text is billed per `text_block_bytes` of UTF-8
//! content, attachments per `file_block_bytes` of file size, both rounded up.
//! Only the student pays; mentor messages are free.

use std::sync::Arc;

use chrono::Utc;
use mentorline_types::config::EngineConfig;
use mentorline_types::error::EngineError;
use mentorline_types::event::RealtimeEvent;
use mentorline_types::message::{Message, MessagePayload};
use mentorline_types::session::Session;
use tracing::{debug, info};
use uuid::Uuid;

use crate::realtime::{FanOut, PresenceTracker};
use crate::repository::session::ChargeRequest;
use crate::repository::{MentorDirectory, PresenceRepository, SessionRepository};
use crate::session::SessionManager;

/// Pricing and billing knobs, taken from `EngineConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPolicy {
    /// Charge student messages while the mentor is offline.
    pub bill_while_offline: bool,
    pub text_block_bytes: u64,
    pub file_block_bytes: u64,
    pub max_attachment_bytes: u64,
}

impl From<&EngineConfig> for BillingPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            bill_while_offline: config.bill_while_offline,
            text_block_bytes: config.text_block_bytes.max(1),
            file_block_bytes: config.file_block_bytes.max(1),
            max_attachment_bytes: config.max_attachment_bytes,
        }
    }
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl BillingPolicy {
    /// Reject payloads that can never be delivered.
    pub fn validate(&self, payload: &MessagePayload) -> Result<(), EngineError> {
        match payload {
            MessagePayload::Text { content } if content.trim().is_empty() => Err(
                EngineError::Validation("message content must not be empty".to_string()),
            ),
            MessagePayload::Attachment(meta) if meta.byte_size == 0 => Err(
                EngineError::Validation("attachment must not be empty".to_string()),
            ),
            MessagePayload::Attachment(meta) if meta.byte_size > self.max_attachment_bytes => {
                Err(EngineError::Validation(format!(
                    "attachment of {} bytes exceeds the {} byte limit",
                    meta.byte_size, self.max_attachment_bytes
                )))
            }
            MessagePayload::Attachment(meta) if meta.url.trim().is_empty() => Err(
                EngineError::Validation("attachment url is required".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Number of billing blocks in a payload.
    pub fn blocks(&self, payload: &MessagePayload) -> u64 {
        match payload {
            MessagePayload::Text { content } => {
                (content.len() as u64).div_ceil(self.text_block_bytes)
            }
            MessagePayload::Attachment(meta) => meta.byte_size.div_ceil(self.file_block_bytes),
        }
    }

    /// Price of a payload at `rate_per_unit` per block.
    pub fn price(&self, payload: &MessagePayload, rate_per_unit: i64) -> Result<i64, EngineError> {
        i64::try_from(self.blocks(payload))
            .ok()
            .and_then(|blocks| blocks.checked_mul(rate_per_unit))
            .ok_or_else(|| EngineError::Validation("message cost overflows".to_string()))
    }
}

/// Turns a submitted payload into a persisted, paid-for message.
pub struct MeteringEngine<S, D, P>
where
    S: SessionRepository,
    D: MentorDirectory,
    P: PresenceRepository,
{
    sessions: Arc<SessionManager<S, D>>,
    presence: Arc<PresenceTracker<P>>,
    fanout: Arc<FanOut>,
    policy: BillingPolicy,
}

impl<S, D, P> MeteringEngine<S, D, P>
where
    S: SessionRepository,
    D: MentorDirectory,
    P: PresenceRepository,
{
    pub fn new(
        sessions: Arc<SessionManager<S, D>>,
        presence: Arc<PresenceTracker<P>>,
        fanout: Arc<FanOut>,
        policy: BillingPolicy,
    ) -> Self {
        Self {
            sessions,
            presence,
            fanout,
            policy,
        }
    }

    pub fn policy(&self) -> &BillingPolicy {
        &self.policy
    }

    /// What `sender_id` would pay for `payload` in `session` right now.
    ///
    /// Zero for the mentor, and for the student while the mentor is offline
    /// if offline billing is disabled.
    pub async fn quote(
        &self,
        session: &Session,
        sender_id: Uuid,
        payload: &MessagePayload,
    ) -> Result<i64, EngineError> {
        if sender_id != session.student_id {
            return Ok(0);
        }
        if !self.policy.bill_while_offline && !self.presence.is_online(&session.mentor_id).await? {
            debug!(session_id = %session.id, "Mentor offline, message not billed");
            return Ok(0);
        }
        self.policy.price(payload, session.rate_per_unit)
    }

    /// Price, charge, persist and deliver one message.
    ///
    /// The debit and the message insert commit together: on
    /// `InsufficientBalance` or `SessionClosed` neither exists.
    pub async fn submit(
        &self,
        session_id: &Uuid,
        sender_id: Uuid,
        payload: MessagePayload,
    ) -> Result<Message, EngineError> {
        let session = self.sessions.get(session_id).await?;
        if !session.is_participant(sender_id) {
            return Err(EngineError::Forbidden(
                "only participants may send messages".to_string(),
            ));
        }
        if !session.state.is_open() {
            return Err(EngineError::SessionClosed);
        }
        self.policy.validate(&payload)?;

        let cost = self.quote(&session, sender_id, &payload).await?;
        let charge = (cost > 0).then(|| ChargeRequest {
            payer_id: sender_id,
            amount: cost,
            description: format!("Session {} {} message", session.id, payload.kind()),
        });

        let message = Message {
            id: Uuid::now_v7(),
            session_id: session.id,
            sender_id,
            payload,
            cost,
            transaction_id: None,
            created_at: Utc::now(),
        };

        let (message, transaction) = self
            .sessions
            .charge_if_open(&message, charge.as_ref())
            .await?;

        info!(
            session_id = %session.id,
            message_id = %message.id,
            kind = message.payload.kind(),
            cost,
            transaction_id = ?transaction.as_ref().map(|t| t.id),
            "Message submitted"
        );

        let delivered = self.fanout.broadcast(
            &session.id,
            &RealtimeEvent::NewMessage {
                message: message.clone(),
            },
        );
        debug!(message_id = %message.id, delivered, "Message fanned out");

        Ok(message)
    }
}
