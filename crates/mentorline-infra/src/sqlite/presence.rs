//! SQLite presence repository implementation.

use chrono::Utc;
use mentorline_core::repository::PresenceRepository;
use mentorline_types::error::RepositoryError;
use mentorline_types::presence::PresenceRecord;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_err};

/// SQLite-backed implementation of `PresenceRepository`.
#[derive(Clone)]
pub struct SqlitePresenceRepository {
    pool: DatabasePool,
}

impl SqlitePresenceRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl PresenceRepository for SqlitePresenceRepository {
    async fn get(&self, mentor_id: &Uuid) -> Result<Option<PresenceRecord>, RepositoryError> {
        let row = sqlx::query("SELECT mentor_id, is_online, last_seen_at FROM presence WHERE mentor_id = ?")
            .bind(mentor_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id: String = row.try_get("mentor_id").map_err(query_err)?;
        let is_online: bool = row.try_get("is_online").map_err(query_err)?;
        let last_seen_at: Option<String> = row.try_get("last_seen_at").map_err(query_err)?;

        Ok(Some(PresenceRecord {
            mentor_id: parse_uuid(&id, "mentor_id")?,
            is_online,
            last_seen_at: last_seen_at.as_deref().map(parse_datetime).transpose()?,
        }))
    }

    async fn upsert(&self, record: &PresenceRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO presence (mentor_id, is_online, last_seen_at, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(mentor_id) DO UPDATE
               SET is_online = excluded.is_online,
                   last_seen_at = excluded.last_seen_at,
                   updated_at = excluded.updated_at"#,
        )
        .bind(record.mentor_id.to_string())
        .bind(record.is_online)
        .bind(record.last_seen_at.as_ref().map(format_datetime))
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let repo = SqlitePresenceRepository::new(DatabasePool::new(&url).await.unwrap());
        let mentor = Uuid::now_v7();

        assert!(repo.get(&mentor).await.unwrap().is_none());

        repo.upsert(&PresenceRecord {
            mentor_id: mentor,
            is_online: true,
            last_seen_at: None,
        })
        .await
        .unwrap();
        assert!(repo.get(&mentor).await.unwrap().unwrap().is_online);

        let seen = parse_datetime(&format_datetime(&Utc::now())).unwrap();
        repo.upsert(&PresenceRecord {
            mentor_id: mentor,
            is_online: false,
            last_seen_at: Some(seen),
        })
        .await
        .unwrap();
        let record = repo.get(&mentor).await.unwrap().unwrap();
        assert!(!record.is_online);
        assert_eq!(record.last_seen_at, Some(seen));
    }
}
