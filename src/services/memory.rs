use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::models::{DirectMessage, Match, Message, Profile, Project, ThreadKey, ThreadRecord};
use crate::services::store::{MatchStore, MessageStore, ProfileDirectory, ProjectDirectory, StoreError};

/// In-process backend for every storage and directory trait
///
/// Profiles keep insertion order, which is the directory order the deck
/// relies on for tie-breaking. Writes can be delayed or made to fail so
/// callers can exercise slow and broken storage.
#[derive(Default)]
pub struct MemoryStore {
    profiles: RwLock<Vec<Profile>>,
    projects: RwLock<Vec<Project>>,
    matches: RwLock<Vec<Match>>,
    messages: RwLock<Vec<Message>>,
    direct_messages: RwLock<Vec<DirectMessage>>,
    fail_writes: AtomicBool,
    write_delay: RwLock<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: RwLock::new(profiles),
            ..Self::default()
        }
    }

    pub async fn add_profile(&self, profile: Profile) {
        self.profiles.write().await.push(profile);
    }

    pub async fn add_project(&self, project: Project) {
        self.projects.write().await.push(project);
    }

    /// Make every subsequent write fail with `StoreError::Unavailable`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Sleep this long before applying each write
    pub async fn set_write_delay(&self, delay: Option<Duration>) {
        *self.write_delay.write().await = delay;
    }

    async fn before_write(&self) -> Result<(), StoreError> {
        let delay = *self.write_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store rejects writes".to_string()));
        }
        Ok(())
    }
}

fn filter_thread<M: ThreadRecord>(all: &[M], thread: Option<&ThreadKey>) -> Vec<M> {
    match thread {
        Some(key) => all.iter().filter(|m| m.belongs_to(key)).cloned().collect(),
        None => all.to_vec(),
    }
}

#[async_trait]
impl ProfileDirectory for MemoryStore {
    async fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        Ok(self.profiles.read().await.clone())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .profiles
            .read()
            .await
            .iter()
            .find(|p| p.id == user_id)
            .cloned())
    }
}

#[async_trait]
impl ProjectDirectory for MemoryStore {
    async fn get_project(&self, project_id: &str) -> Result<Option<Project>, StoreError> {
        Ok(self
            .projects
            .read()
            .await
            .iter()
            .find(|p| p.id == project_id)
            .cloned())
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn list_matches(&self) -> Result<Vec<Match>, StoreError> {
        Ok(self.matches.read().await.clone())
    }

    async fn append_match(&self, record: Match) -> Result<(), StoreError> {
        self.before_write().await?;
        self.matches.write().await.push(record);
        Ok(())
    }

    async fn persist_matches(&self, records: Vec<Match>) -> Result<(), StoreError> {
        self.before_write().await?;
        *self.matches.write().await = records;
        Ok(())
    }
}

#[async_trait]
impl MessageStore<Message> for MemoryStore {
    async fn list_messages(&self, thread: Option<&ThreadKey>) -> Result<Vec<Message>, StoreError> {
        Ok(filter_thread(&self.messages.read().await, thread))
    }

    async fn append_message(&self, message: Message) -> Result<(), StoreError> {
        self.before_write().await?;
        self.messages.write().await.push(message);
        Ok(())
    }

    async fn persist_messages(&self, messages: Vec<Message>) -> Result<(), StoreError> {
        self.before_write().await?;
        *self.messages.write().await = messages;
        Ok(())
    }
}

#[async_trait]
impl MessageStore<DirectMessage> for MemoryStore {
    async fn list_messages(&self, thread: Option<&ThreadKey>) -> Result<Vec<DirectMessage>, StoreError> {
        Ok(filter_thread(&self.direct_messages.read().await, thread))
    }

    async fn append_message(&self, message: DirectMessage) -> Result<(), StoreError> {
        self.before_write().await?;
        self.direct_messages.write().await.push(message);
        Ok(())
    }

    async fn persist_messages(&self, messages: Vec<DirectMessage>) -> Result<(), StoreError> {
        self.before_write().await?;
        *self.direct_messages.write().await = messages;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(id: &str, match_id: &str) -> Message {
        Message {
            id: id.to_string(),
            match_id: match_id.to_string(),
            sender_id: "u1".to_string(),
            receiver_id: "u2".to_string(),
            content: "hi".to_string(),
            sent_at: Utc::now(),
            read: false,
        }
    }

    #[tokio::test]
    async fn test_thread_filter() {
        let store = MemoryStore::new();
        MessageStore::<Message>::append_message(&store, message("a", "m1")).await.unwrap();
        MessageStore::<Message>::append_message(&store, message("b", "m2")).await.unwrap();

        let key = ThreadKey::for_match("m1");
        let thread = MessageStore::<Message>::list_messages(&store, Some(&key)).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].id, "a");

        let all = MessageStore::<Message>::list_messages(&store, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_collection_untouched() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);

        let result = MessageStore::<Message>::append_message(&store, message("a", "m1")).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));

        let all = MessageStore::<Message>::list_messages(&store, None).await.unwrap();
        assert!(all.is_empty());
    }
}
