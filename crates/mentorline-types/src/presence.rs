use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A mentor's online flag and the last time they were seen going offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub mentor_id: Uuid,
    pub is_online: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl PresenceRecord {
    /// Presence for a mentor that has never reported in.
    pub fn unknown(mentor_id: Uuid) -> Self {
        Self {
            mentor_id,
            is_online: false,
            last_seen_at: None,
        }
    }
}
