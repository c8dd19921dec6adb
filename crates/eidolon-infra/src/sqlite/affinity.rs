//! SQLite affinity store implementation.
//!
//! Implements `AffinityStore` from `eidolon-core` using sqlx with split
//! read/write pools: raw queries, a private Row struct, reads on the
//! reader pool and writes on the single-connection writer.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use eidolon_core::affinity::store::AffinityStore;
use eidolon_types::affinity::AffinityRecord;
use eidolon_types::error::AffinityError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `AffinityStore`.
pub struct SqliteAffinityStore {
    pool: DatabasePool,
}

impl SqliteAffinityStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain AffinityRecord.
struct AffinityRow {
    persona_id: String,
    interlocutor_id: String,
    current_score: f64,
    total_conversations: i64,
    total_messages: i64,
    last_updated_at: String,
}

impl AffinityRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            persona_id: row.try_get("persona_id")?,
            interlocutor_id: row.try_get("interlocutor_id")?,
            current_score: row.try_get("current_score")?,
            total_conversations: row.try_get("total_conversations")?,
            total_messages: row.try_get("total_messages")?,
            last_updated_at: row.try_get("last_updated_at")?,
        })
    }

    fn into_record(self) -> Result<AffinityRecord, AffinityError> {
        let persona_id = Uuid::parse_str(&self.persona_id)
            .map_err(|e| AffinityError::Store(format!("invalid persona_id: {e}")))?;
        let interlocutor_id = Uuid::parse_str(&self.interlocutor_id)
            .map_err(|e| AffinityError::Store(format!("invalid interlocutor_id: {e}")))?;
        let last_updated_at = DateTime::parse_from_rfc3339(&self.last_updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AffinityError::Store(format!("invalid last_updated_at: {e}")))?;

        Ok(AffinityRecord {
            persona_id,
            interlocutor_id,
            current_score: self.current_score,
            total_conversations: self.total_conversations as u32,
            total_messages: self.total_messages as u32,
            last_updated_at,
        })
    }
}

impl AffinityStore for SqliteAffinityStore {
    async fn get(
        &self,
        persona_id: &Uuid,
        interlocutor_id: &Uuid,
    ) -> Result<Option<AffinityRecord>, AffinityError> {
        let row = sqlx::query(
            "SELECT persona_id, interlocutor_id, current_score, total_conversations, \
             total_messages, last_updated_at \
             FROM affinity_records WHERE persona_id = ? AND interlocutor_id = ?",
        )
        .bind(persona_id.to_string())
        .bind(interlocutor_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| AffinityError::Store(e.to_string()))?;

        row.map(|r| {
            AffinityRow::from_row(&r)
                .map_err(|e| AffinityError::Store(e.to_string()))?
                .into_record()
        })
        .transpose()
    }

    async fn put(&self, record: &AffinityRecord) -> Result<(), AffinityError> {
        sqlx::query(
            "INSERT OR REPLACE INTO affinity_records \
             (persona_id, interlocutor_id, current_score, total_conversations, \
              total_messages, last_updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.persona_id.to_string())
        .bind(record.interlocutor_id.to_string())
        .bind(record.current_score)
        .bind(i64::from(record.total_conversations))
        .bind(i64::from(record.total_messages))
        .bind(record.last_updated_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| AffinityError::Store(e.to_string()))?;

        Ok(())
    }

    async fn list_for_persona(
        &self,
        persona_id: &Uuid,
    ) -> Result<Vec<AffinityRecord>, AffinityError> {
        let rows = sqlx::query(
            "SELECT persona_id, interlocutor_id, current_score, total_conversations, \
             total_messages, last_updated_at \
             FROM affinity_records WHERE persona_id = ? ORDER BY interlocutor_id",
        )
        .bind(persona_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| AffinityError::Store(e.to_string()))?;

        rows.iter()
            .map(|r| {
                AffinityRow::from_row(r)
                    .map_err(|e| AffinityError::Store(e.to_string()))?
                    .into_record()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_store() -> (SqliteAffinityStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("affinity.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (SqliteAffinityStore::new(pool), dir)
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (store, _dir) = setup_store().await;
        let result = store.get(&Uuid::now_v7(), &Uuid::now_v7()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_and_get_roundtrip() {
        let (store, _dir) = setup_store().await;
        let record = AffinityRecord::new(Uuid::now_v7(), Uuid::now_v7(), 62.5);

        store.put(&record).await.unwrap();
        let loaded = store
            .get(&record.persona_id, &record.interlocutor_id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(loaded.persona_id, record.persona_id);
        assert_eq!(loaded.interlocutor_id, record.interlocutor_id);
        assert!((loaded.current_score - 62.5).abs() < f64::EPSILON);
        assert_eq!(loaded.total_conversations, 0);
    }

    #[tokio::test]
    async fn test_put_replaces_existing() {
        let (store, _dir) = setup_store().await;
        let mut record = AffinityRecord::new(Uuid::now_v7(), Uuid::now_v7(), 50.0);
        store.put(&record).await.unwrap();

        record.current_score = 77.0;
        record.total_messages = 12;
        store.put(&record).await.unwrap();

        let loaded = store
            .get(&record.persona_id, &record.interlocutor_id)
            .await
            .unwrap()
            .unwrap();
        assert!((loaded.current_score - 77.0).abs() < f64::EPSILON);
        assert_eq!(loaded.total_messages, 12);
    }

    #[tokio::test]
    async fn test_list_for_persona_filters() {
        let (store, _dir) = setup_store().await;
        let persona_a = Uuid::now_v7();
        let persona_b = Uuid::now_v7();

        store
            .put(&AffinityRecord::new(persona_a, Uuid::now_v7(), 40.0))
            .await
            .unwrap();
        store
            .put(&AffinityRecord::new(persona_a, Uuid::now_v7(), 60.0))
            .await
            .unwrap();
        store
            .put(&AffinityRecord::new(persona_b, Uuid::now_v7(), 80.0))
            .await
            .unwrap();

        let records = store.list_for_persona(&persona_a).await.unwrap();
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.persona_id, persona_a);
        }
    }
}
