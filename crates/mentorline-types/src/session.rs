//! Conversation session types.
//!
//! A session is one billable mentor-student conversation. Its lifecycle:
//!
//! ```text
//! scheduled -> ongoing -> completed
//!     |           |
//!     +-> cancelled, no_show   (from scheduled only)
//! ```
//!
//! Terminal states (`completed`, `cancelled`, `no_show`) are final.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a session.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (state IN ('scheduled', 'ongoing', 'completed', 'cancelled', 'no_show'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Scheduled,
    Ongoing,
    Completed,
    Cancelled,
    NoShow,
}

impl SessionState {
    /// States in which messages may still be sent and billed.
    pub const OPEN: [SessionState; 2] = [SessionState::Scheduled, SessionState::Ongoing];

    /// Whether the session still accepts messages and charges.
    pub fn is_open(self) -> bool {
        Self::OPEN.contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_open()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Scheduled => "scheduled",
            SessionState::Ongoing => "ongoing",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
            SessionState::NoShow => "no_show",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(SessionState::Scheduled),
            "ongoing" => Ok(SessionState::Ongoing),
            "completed" => Ok(SessionState::Completed),
            "cancelled" => Ok(SessionState::Cancelled),
            "no_show" => Ok(SessionState::NoShow),
            other => Err(format!("invalid session state: '{other}'")),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Scheduled
    }
}

/// One mentor-student conversation.
///
/// `accumulated_cost` grows with every charged student message while the
/// session is open and is frozen once the session reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub student_id: Uuid,
    pub state: SessionState,
    /// Price of one block, in the smallest currency unit.
    pub rate_per_unit: i64,
    pub accumulated_cost: i64,
    pub created_at: DateTime<Utc>,
    /// Set when the mentor starts the session.
    pub started_at: Option<DateTime<Utc>>,
    /// Set when the session reaches a terminal state.
    pub ended_at: Option<DateTime<Utc>>,
    /// Student's rating of a completed session, within [`RATING_RANGE`].
    pub rating: Option<u8>,
    pub feedback: Option<String>,
}

/// Ratings a student may give.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Aggregate of the ratings a mentor has received.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub count: i64,
    /// `None` until the first rating arrives.
    pub average: Option<f64>,
}

impl Session {
    /// Whether `user_id` is the mentor or the student of this session.
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.mentor_id == user_id || self.student_id == user_id
    }

    /// The other participant, if `user_id` is one of them.
    pub fn counterpart(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.mentor_id {
            Some(self.student_id)
        } else if user_id == self.student_id {
            Some(self.mentor_id)
        } else {
            None
        }
    }
}
