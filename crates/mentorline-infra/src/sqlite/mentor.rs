//! SQLite mentor directory implementation.
//!
//! The `mentors` table mirrors approval decisions made by the onboarding
//! workflow. The engine only reads it; the admin CLI can seed it.

use chrono::Utc;
use mentorline_core::repository::MentorDirectory;
use mentorline_types::error::RepositoryError;
use mentorline_types::identity::MentorStatus;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, query_err};

/// SQLite-backed implementation of `MentorDirectory`.
#[derive(Clone)]
pub struct SqliteMentorDirectory {
    pool: DatabasePool,
}

impl SqliteMentorDirectory {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl MentorDirectory for SqliteMentorDirectory {
    async fn mentor_status(&self, user_id: &Uuid) -> Result<Option<MentorStatus>, RepositoryError> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM mentors WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        status
            .map(|s| s.parse().map_err(|e: String| RepositoryError::Query(e)))
            .transpose()
    }

    async fn set_mentor_status(
        &self,
        user_id: &Uuid,
        status: MentorStatus,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO mentors (user_id, status, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(user_id) DO UPDATE
               SET status = excluded.status, updated_at = excluded.updated_at"#,
        )
        .bind(user_id.to_string())
        .bind(status.to_string())
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }

    async fn mentor_rate(&self, user_id: &Uuid) -> Result<Option<i64>, RepositoryError> {
        sqlx::query_scalar::<_, i64>("SELECT rate_per_unit FROM mentors WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)
    }

    async fn set_mentor_rate(
        &self,
        user_id: &Uuid,
        rate_per_unit: i64,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE mentors SET rate_per_unit = ?, updated_at = ? WHERE user_id = ?",
        )
        .bind(rate_per_unit)
        .bind(format_datetime(&Utc::now()))
        .bind(user_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let directory = SqliteMentorDirectory::new(DatabasePool::new(&url).await.unwrap());
        let mentor = Uuid::now_v7();

        assert_eq!(directory.mentor_status(&mentor).await.unwrap(), None);

        directory
            .set_mentor_status(&mentor, MentorStatus::Pending)
            .await
            .unwrap();
        directory
            .set_mentor_status(&mentor, MentorStatus::Approved)
            .await
            .unwrap();

        assert_eq!(
            directory.mentor_status(&mentor).await.unwrap(),
            Some(MentorStatus::Approved)
        );
    }

    #[tokio::test]
    async fn test_rate_requires_registered_mentor() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let directory = SqliteMentorDirectory::new(DatabasePool::new(&url).await.unwrap());
        let mentor = Uuid::now_v7();

        assert!(!directory.set_mentor_rate(&mentor, 12).await.unwrap());
        assert_eq!(directory.mentor_rate(&mentor).await.unwrap(), None);

        directory
            .set_mentor_status(&mentor, MentorStatus::Approved)
            .await
            .unwrap();
        assert_eq!(directory.mentor_rate(&mentor).await.unwrap(), Some(0));

        assert!(directory.set_mentor_rate(&mentor, 12).await.unwrap());
        directory
            .set_mentor_status(&mentor, MentorStatus::Suspended)
            .await
            .unwrap();
        assert_eq!(directory.mentor_rate(&mentor).await.unwrap(), Some(12));
        assert!(directory.set_mentor_rate(&mentor, -1).await.is_err());
    }
}
