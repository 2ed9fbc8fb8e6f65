//! Presence repository trait definition.

use mentorline_types::error::RepositoryError;
use mentorline_types::presence::PresenceRecord;
use uuid::Uuid;

pub trait PresenceRepository: Send + Sync {
    /// Get the stored presence record for a mentor.
    fn get(
        &self,
        mentor_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<PresenceRecord>, RepositoryError>> + Send;

    /// Insert or replace a mentor's presence record.
    fn upsert(
        &self,
        record: &PresenceRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
