//! Mentor directory trait definition.
//!
//! Mentor onboarding and approval live outside the engine; the directory is
//! the narrow read interface the Session Manager needs from them.

use mentorline_types::error::RepositoryError;
use mentorline_types::identity::MentorStatus;
use uuid::Uuid;

pub trait MentorDirectory: Send + Sync {
    /// Current approval status of a mentor, or `None` if the user never applied.
    fn mentor_status(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<MentorStatus>, RepositoryError>> + Send;

    /// Record a mentor's approval status (seeded by the onboarding system).
    fn set_mentor_status(
        &self,
        user_id: &Uuid,
        status: MentorStatus,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Price per billing block a mentor charges, or `None` if the user never
    /// applied.
    fn mentor_rate(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<i64>, RepositoryError>> + Send;

    /// Set a registered mentor's rate. Returns `false` if the mentor is not
    /// in the directory.
    fn set_mentor_rate(
        &self,
        user_id: &Uuid,
        rate_per_unit: i64,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
