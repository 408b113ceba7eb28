use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

use crate::models::{DirectMessage, Match, Message, ThreadKey};
use crate::services::store::{MatchStore, MessageStore, StoreError};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

impl From<PostgresError> for StoreError {
    fn from(value: PostgresError) -> Self {
        StoreError::Database(value.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        StoreError::Database(value.to_string())
    }
}

/// PostgreSQL backend for matches, match messages and direct messages
///
/// Rows keep a `seq` column so equal timestamps still come back in append
/// order. `persist_*` upserts the given rows inside one transaction and
/// never deletes.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn match_from_row(row: &PgRow) -> Match {
    Match {
        id: row.get("id"),
        user_a: row.get("user_a"),
        user_b: row.get("user_b"),
        created_at: row.get("created_at"),
        read: row.get("read"),
    }
}

fn message_from_row(row: &PgRow) -> Message {
    Message {
        id: row.get("id"),
        match_id: row.get("match_id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        content: row.get("content"),
        sent_at: row.get("sent_at"),
        read: row.get("read"),
    }
}

fn direct_message_from_row(row: &PgRow) -> DirectMessage {
    DirectMessage {
        id: row.get("id"),
        project_id: row.get("project_id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        sender_name: row.get("sender_name"),
        receiver_name: row.get("receiver_name"),
        content: row.get("content"),
        sent_at: row.get("sent_at"),
        read: row.get("read"),
    }
}

#[async_trait]
impl MatchStore for PostgresStore {
    async fn list_matches(&self) -> Result<Vec<Match>, StoreError> {
        let query = r#"
            SELECT id, user_a, user_b, created_at, read
            FROM matches
            ORDER BY seq
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(match_from_row).collect())
    }

    async fn append_match(&self, record: Match) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO matches (id, user_a, user_b, created_at, read)
            VALUES ($1, $2, $3, $4, $5)
        "#;

        sqlx::query(query)
            .bind(&record.id)
            .bind(&record.user_a)
            .bind(&record.user_b)
            .bind(record.created_at)
            .bind(record.read)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Inserted match {}", record.id);
        Ok(())
    }

    async fn persist_matches(&self, records: Vec<Match>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for record in &records {
            sqlx::query(
                r#"
                INSERT INTO matches (id, user_a, user_b, created_at, read)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (id) DO UPDATE SET read = EXCLUDED.read
                "#,
            )
            .bind(&record.id)
            .bind(&record.user_a)
            .bind(&record.user_b)
            .bind(record.created_at)
            .bind(record.read)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!("Persisted {} matches", records.len());
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[async_trait]
impl MessageStore<Message> for PostgresStore {
    async fn list_messages(&self, thread: Option<&ThreadKey>) -> Result<Vec<Message>, StoreError> {
        let rows = match thread {
            None => {
                sqlx::query(
                    "SELECT id, match_id, sender_id, receiver_id, content, sent_at, read FROM messages ORDER BY seq",
                )
                .fetch_all(&self.pool)
                .await?
            }
            Some(ThreadKey::Match { match_id }) => {
                sqlx::query(
                    r#"
                    SELECT id, match_id, sender_id, receiver_id, content, sent_at, read
                    FROM messages
                    WHERE match_id = $1
                    ORDER BY seq
                    "#,
                )
                .bind(match_id)
                .fetch_all(&self.pool)
                .await?
            }
            Some(ThreadKey::Project { .. }) => return Ok(Vec::new()),
        };

        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn append_message(&self, message: Message) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, match_id, sender_id, receiver_id, content, sent_at, read)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&message.id)
        .bind(&message.match_id)
        .bind(&message.sender_id)
        .bind(&message.receiver_id)
        .bind(&message.content)
        .bind(message.sent_at)
        .bind(message.read)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn persist_messages(&self, messages: Vec<Message>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for message in &messages {
            sqlx::query(
                r#"
                INSERT INTO messages (id, match_id, sender_id, receiver_id, content, sent_at, read)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (id) DO UPDATE SET read = EXCLUDED.read
                "#,
            )
            .bind(&message.id)
            .bind(&message.match_id)
            .bind(&message.sender_id)
            .bind(&message.receiver_id)
            .bind(&message.content)
            .bind(message.sent_at)
            .bind(message.read)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!("Persisted {} messages", messages.len());
        Ok(())
    }
}

#[async_trait]
impl MessageStore<DirectMessage> for PostgresStore {
    async fn list_messages(&self, thread: Option<&ThreadKey>) -> Result<Vec<DirectMessage>, StoreError> {
        let columns = "id, project_id, sender_id, receiver_id, sender_name, receiver_name, content, sent_at, read";

        let rows = match thread {
            None => {
                sqlx::query(&format!("SELECT {} FROM direct_messages ORDER BY seq", columns))
                    .fetch_all(&self.pool)
                    .await?
            }
            Some(ThreadKey::Project { project_id, low, high }) => {
                sqlx::query(&format!(
                    r#"
                    SELECT {}
                    FROM direct_messages
                    WHERE project_id = $1
                      AND ((sender_id = $2 AND receiver_id = $3) OR (sender_id = $3 AND receiver_id = $2))
                    ORDER BY seq
                    "#,
                    columns
                ))
                .bind(project_id)
                .bind(low)
                .bind(high)
                .fetch_all(&self.pool)
                .await?
            }
            Some(ThreadKey::Match { .. }) => return Ok(Vec::new()),
        };

        Ok(rows.iter().map(direct_message_from_row).collect())
    }

    async fn append_message(&self, message: DirectMessage) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO direct_messages
                (id, project_id, sender_id, receiver_id, sender_name, receiver_name, content, sent_at, read)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&message.id)
        .bind(&message.project_id)
        .bind(&message.sender_id)
        .bind(&message.receiver_id)
        .bind(&message.sender_name)
        .bind(&message.receiver_name)
        .bind(&message.content)
        .bind(message.sent_at)
        .bind(message.read)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn persist_messages(&self, messages: Vec<DirectMessage>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for message in &messages {
            sqlx::query(
                r#"
                INSERT INTO direct_messages
                    (id, project_id, sender_id, receiver_id, sender_name, receiver_name, content, sent_at, read)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (id) DO UPDATE SET read = EXCLUDED.read
                "#,
            )
            .bind(&message.id)
            .bind(&message.project_id)
            .bind(&message.sender_id)
            .bind(&message.receiver_id)
            .bind(&message.sender_name)
            .bind(&message.receiver_name)
            .bind(&message.content)
            .bind(message.sent_at)
            .bind(message.read)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!("Persisted {} direct messages", messages.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err: StoreError = PostgresError::SqlxError(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_match_roundtrip() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let store = PostgresStore::from_settings(&url, Some(2), Some(1), None, None)
            .await
            .expect("Failed to connect");

        assert!(store.health_check().await.unwrap());
        let before = store.list_matches().await.unwrap().len();

        let record = Match {
            id: uuid::Uuid::new_v4().to_string(),
            user_a: uuid::Uuid::new_v4().to_string(),
            user_b: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now(),
            read: false,
        };
        store.append_match(record.clone()).await.unwrap();

        let after = store.list_matches().await.unwrap();
        assert_eq!(after.len(), before + 1);
        assert!(after.iter().any(|m| m.id == record.id));
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_persist_subset_keeps_other_matches() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let store = PostgresStore::from_settings(&url, Some(2), Some(1), None, None)
            .await
            .expect("Failed to connect");

        let record = |read: bool| Match {
            id: uuid::Uuid::new_v4().to_string(),
            user_a: uuid::Uuid::new_v4().to_string(),
            user_b: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now(),
            read,
        };
        let untouched = record(false);
        let mut updated = record(false);
        store.append_match(untouched.clone()).await.unwrap();
        store.append_match(updated.clone()).await.unwrap();

        updated.read = true;
        store.persist_matches(vec![updated.clone()]).await.unwrap();

        let all = store.list_matches().await.unwrap();
        assert!(all.iter().any(|m| m.id == untouched.id && !m.read));
        assert!(all.iter().any(|m| m.id == updated.id && m.read));
    }
}
