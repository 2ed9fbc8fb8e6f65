//! Mentor availability.
//!
//! Every change is persisted first and then announced to all live
//! connections as a `PRESENCE` event.

use std::sync::Arc;

use chrono::Utc;
use mentorline_types::error::EngineError;
use mentorline_types::event::RealtimeEvent;
use mentorline_types::presence::PresenceRecord;
use tracing::{debug, info};
use uuid::Uuid;

use crate::realtime::fanout::FanOut;
use crate::repository::PresenceRepository;

/// Records mentor presence and broadcasts changes.
pub struct PresenceTracker<P: PresenceRepository> {
    repo: P,
    fanout: Arc<FanOut>,
}

impl<P: PresenceRepository> PresenceTracker<P> {
    pub fn new(repo: P, fanout: Arc<FanOut>) -> Self {
        Self { repo, fanout }
    }

    /// Set a mentor online or offline.
    ///
    /// `last_seen_at` is stamped when an online mentor goes offline.
    pub async fn set_presence(
        &self,
        mentor_id: &Uuid,
        is_online: bool,
    ) -> Result<PresenceRecord, EngineError> {
        let current = self.get(mentor_id).await?;

        let last_seen_at = if current.is_online && !is_online {
            Some(Utc::now())
        } else {
            current.last_seen_at
        };
        let record = PresenceRecord {
            mentor_id: *mentor_id,
            is_online,
            last_seen_at,
        };
        self.repo.upsert(&record).await?;

        if current.is_online != is_online {
            info!(mentor_id = %mentor_id, is_online, "Mentor presence changed");
        }
        let delivered = self.fanout.broadcast_all(&RealtimeEvent::from(&record));
        debug!(mentor_id = %mentor_id, delivered, "Presence broadcast");

        Ok(record)
    }

    /// Current presence. Mentors never seen are reported offline.
    pub async fn get(&self, mentor_id: &Uuid) -> Result<PresenceRecord, EngineError> {
        Ok(self
            .repo
            .get(mentor_id)
            .await?
            .unwrap_or_else(|| PresenceRecord::unknown(*mentor_id)))
    }

    pub async fn is_online(&self, mentor_id: &Uuid) -> Result<bool, EngineError> {
        Ok(self.get(mentor_id).await?.is_online)
    }

    /// Mark a mentor offline once their last live connection has closed.
    ///
    /// Returns the new record, or `None` if the mentor still has connections
    /// or was already offline.
    pub async fn on_disconnect(&self, mentor_id: &Uuid) -> Result<Option<PresenceRecord>, EngineError> {
        if self.fanout.user_connection_count(mentor_id) > 0 {
            return Ok(None);
        }
        if !self.is_online(mentor_id).await? {
            return Ok(None);
        }
        self.set_presence(mentor_id, false).await.map(Some)
    }
}
