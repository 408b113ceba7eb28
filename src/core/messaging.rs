use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::write::complete_write;
use crate::error::{CoreError, Result};
use crate::models::{ThreadKey, ThreadRecord};
use crate::services::MessageStore;

/// Longest message body accepted, in characters
pub const MAX_MESSAGE_CHARS: usize = 500;

/// Check a message body before anything touches storage
pub fn validate_content(content: &str, max_chars: usize) -> Result<()> {
    if content.trim().is_empty() {
        return Err(CoreError::EmptyMessage);
    }

    let length = content.chars().count();
    if length > max_chars {
        return Err(CoreError::MessageTooLong { length, max: max_chars });
    }

    Ok(())
}

/// Thread engine shared by match-scoped and project-scoped conversations
///
/// Threads are append-only. Reads return messages ordered by `sent_at`;
/// the sort is stable so messages with the same timestamp stay in append
/// order. Writes hold the collection's write lock for the whole
/// read-modify-write cycle.
pub struct Conversations<M: ThreadRecord> {
    store: Arc<dyn MessageStore<M>>,
    write_lock: Arc<Mutex<()>>,
    max_chars: usize,
}

impl<M: ThreadRecord> Clone for Conversations<M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            write_lock: Arc::clone(&self.write_lock),
            max_chars: self.max_chars,
        }
    }
}

impl<M: ThreadRecord> Conversations<M> {
    pub fn new(store: Arc<dyn MessageStore<M>>) -> Self {
        Self::with_max_chars(store, MAX_MESSAGE_CHARS)
    }

    pub fn with_max_chars(store: Arc<dyn MessageStore<M>>, max_chars: usize) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
            max_chars,
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn validate(&self, content: &str) -> Result<()> {
        validate_content(content, self.max_chars)
    }

    /// Append a fully built record; returned once the store confirmed it
    pub async fn append(&self, record: M) -> Result<M> {
        let store = Arc::clone(&self.store);
        let lock = Arc::clone(&self.write_lock);

        complete_write(async move {
            let _guard = lock.lock().await;
            store.append_message(record.clone()).await?;
            debug!("Appended message {} to {}", record.id(), record.thread_key());
            Ok(record)
        })
        .await
    }

    /// All messages of a thread, oldest first
    pub async fn thread_messages(&self, key: &ThreadKey) -> Result<Vec<M>> {
        if !key.is_well_formed() {
            return Err(CoreError::InvalidThreadKey(key.to_string()));
        }

        let mut messages: Vec<M> = self
            .store
            .list_messages(Some(key))
            .await?
            .into_iter()
            .filter(|m| m.belongs_to(key))
            .collect();

        messages.sort_by_key(|m| m.sent_at());
        Ok(messages)
    }

    pub async fn last_message(&self, key: &ThreadKey) -> Result<Option<M>> {
        Ok(self.thread_messages(key).await?.pop())
    }

    /// Mark everything the reader received in this thread as read
    ///
    /// Returns how many messages changed. Nothing is written when no
    /// message qualifies, so calling this twice is harmless.
    pub async fn mark_thread_read(&self, key: &ThreadKey, reader_id: &str) -> Result<usize> {
        if !key.is_well_formed() {
            return Err(CoreError::InvalidThreadKey(key.to_string()));
        }

        let store = Arc::clone(&self.store);
        let lock = Arc::clone(&self.write_lock);
        let key = key.clone();
        let reader_id = reader_id.to_string();

        complete_write(async move {
            let _guard = lock.lock().await;

            let mut all = store.list_messages(None).await?;
            let mut marked = 0;
            for message in all.iter_mut() {
                if message.belongs_to(&key) && message.receiver_id() == reader_id && !message.is_read() {
                    message.mark_read();
                    marked += 1;
                }
            }

            if marked == 0 {
                return Ok(0);
            }

            store.persist_messages(all).await?;
            debug!("Marked {} messages read in {} for {}", marked, key, reader_id);
            Ok(marked)
        })
        .await
    }

    pub async fn unread_count(&self, key: &ThreadKey, viewer_id: &str) -> Result<usize> {
        let messages = self.thread_messages(key).await?;
        Ok(messages
            .iter()
            .filter(|m| m.receiver_id() == viewer_id && !m.is_read())
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;
    use crate::services::MemoryStore;
    use chrono::{Duration, Utc};

    fn message(id: &str, receiver: &str, offset_secs: i64) -> Message {
        let sender = if receiver == "u1" { "u2" } else { "u1" };
        Message {
            id: id.to_string(),
            match_id: "m1".to_string(),
            sender_id: sender.to_string(),
            receiver_id: receiver.to_string(),
            content: format!("message {}", id),
            sent_at: Utc::now() + Duration::seconds(offset_secs),
            read: false,
        }
    }

    fn conversations() -> (Arc<MemoryStore>, Conversations<Message>) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), Conversations::new(store))
    }

    #[test]
    fn test_validate_content() {
        assert!(matches!(validate_content("   ", 500), Err(CoreError::EmptyMessage)));
        assert!(matches!(validate_content("", 500), Err(CoreError::EmptyMessage)));
        assert!(matches!(
            validate_content(&"a".repeat(501), 500),
            Err(CoreError::MessageTooLong { length: 501, max: 500 })
        ));
        assert!(validate_content(&"a".repeat(500), 500).is_ok());
        // Characters, not bytes
        assert!(validate_content(&"é".repeat(500), 500).is_ok());
    }

    #[tokio::test]
    async fn test_thread_sorted_by_sent_at() {
        let (_, conversations) = conversations();
        conversations.append(message("late", "u1", 30)).await.unwrap();
        conversations.append(message("early", "u2", -30)).await.unwrap();
        conversations.append(message("middle", "u1", 0)).await.unwrap();

        let thread = conversations.thread_messages(&ThreadKey::for_match("m1")).await.unwrap();
        let ids: Vec<&str> = thread.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "middle", "late"]);

        let last = conversations.last_message(&ThreadKey::for_match("m1")).await.unwrap();
        assert_eq!(last.unwrap().id, "late");
    }

    #[tokio::test]
    async fn test_mark_read_only_touches_reader() {
        let (_, conversations) = conversations();
        let key = ThreadKey::for_match("m1");
        conversations.append(message("a", "u1", 0)).await.unwrap();
        conversations.append(message("b", "u1", 1)).await.unwrap();
        conversations.append(message("c", "u2", 2)).await.unwrap();

        assert_eq!(conversations.mark_thread_read(&key, "u1").await.unwrap(), 2);
        assert_eq!(conversations.unread_count(&key, "u1").await.unwrap(), 0);
        assert_eq!(conversations.unread_count(&key, "u2").await.unwrap(), 1);

        // Second call is a no-op
        assert_eq!(conversations.mark_thread_read(&key, "u1").await.unwrap(), 0);
        assert_eq!(conversations.unread_count(&key, "u2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_noop_mark_read_skips_write() {
        let (store, conversations) = conversations();
        store.set_fail_writes(true);

        // Nothing qualifies, so the failing store is never written to
        let marked = conversations
            .mark_thread_read(&ThreadKey::for_match("m1"), "u1")
            .await
            .unwrap();
        assert_eq!(marked, 0);
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let (_, conversations) = conversations();
        let result = conversations.thread_messages(&ThreadKey::for_match("")).await;
        assert!(matches!(result, Err(CoreError::InvalidThreadKey(_))));
    }
}
