//! Storage and directory boundaries
//!
//! The core never owns profiles or projects; it reads them through the
//! directory traits. Matches and messages are persisted through the store
//! traits, which follow a read-modify-write discipline: callers read the full
//! collection, compute the new one and write it back.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Match, Profile, Project, ThreadKey};

/// Errors reported by a storage or directory backend
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Directory request failed: {0}")]
    Directory(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Write interrupted: {0}")]
    Interrupted(String),
}

/// Read access to musician profiles; `get_profile` doubles as the
/// current-viewer accessor
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;
}

/// Read access to collaboration projects
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    async fn get_project(&self, project_id: &str) -> Result<Option<Project>, StoreError>;
}

/// Backing collection for the match ledger
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn list_matches(&self) -> Result<Vec<Match>, StoreError>;

    async fn append_match(&self, record: Match) -> Result<(), StoreError>;

    /// Write back the read-modify-write result; stored matches are never removed
    async fn persist_matches(&self, records: Vec<Match>) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

/// Backing collection for one message kind
#[async_trait]
pub trait MessageStore<M>: Send + Sync
where
    M: Send + 'static,
{
    /// All messages, or only those of `thread` when given
    async fn list_messages(&self, thread: Option<&ThreadKey>) -> Result<Vec<M>, StoreError>;

    async fn append_message(&self, message: M) -> Result<(), StoreError>;

    /// Replace the stored collection with `messages`
    async fn persist_messages(&self, messages: Vec<M>) -> Result<(), StoreError>;
}
