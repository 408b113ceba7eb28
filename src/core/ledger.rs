use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::write::complete_write;
use crate::error::{CoreError, Result};
use crate::models::Match;
use crate::services::MatchStore;

/// Match ledger - at most one match per unordered user pair
///
/// Every mutation is a full read-modify-write cycle over the match
/// collection, serialized by a single write lock shared by all clones.
#[derive(Clone)]
pub struct MatchLedger {
    store: Arc<dyn MatchStore>,
    write_lock: Arc<Mutex<()>>,
}

impl MatchLedger {
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create the match between two users, or return the existing one
    ///
    /// Calling this with the same pair in either order yields a single
    /// persisted record. The returned match is durable: it is only handed
    /// back once the store confirmed the write.
    pub async fn create_match(&self, user_id: &str, matched_user_id: &str) -> Result<Match> {
        if user_id.is_empty() || matched_user_id.is_empty() {
            return Err(CoreError::InvalidPair("user ids must not be empty".to_string()));
        }
        if user_id == matched_user_id {
            return Err(CoreError::InvalidPair(format!("{} cannot match with themselves", user_id)));
        }

        let store = Arc::clone(&self.store);
        let lock = Arc::clone(&self.write_lock);
        let user_a = user_id.to_string();
        let user_b = matched_user_id.to_string();

        complete_write(async move {
            let _guard = lock.lock().await;

            let existing = store.list_matches().await?;
            if let Some(found) = existing.into_iter().find(|m| m.pairs(&user_a, &user_b)) {
                debug!("Match already exists for {} <-> {}: {}", user_a, user_b, found.id);
                return Ok(found);
            }

            let record = Match {
                id: uuid::Uuid::new_v4().to_string(),
                user_a,
                user_b,
                created_at: Utc::now(),
                read: false,
            };
            store.append_match(record.clone()).await?;

            info!("Created match {}: {} <-> {}", record.id, record.user_a, record.user_b);
            Ok(record)
        })
        .await
    }

    /// Every match the user takes part in, in insertion order
    pub async fn matches_for(&self, user_id: &str) -> Result<Vec<Match>> {
        let matches = self.store.list_matches().await?;
        Ok(matches.into_iter().filter(|m| m.involves(user_id)).collect())
    }

    /// Same as [`matches_for`](Self::matches_for), newest first
    pub async fn recent_matches_for(&self, user_id: &str) -> Result<Vec<Match>> {
        let mut matches = self.matches_for(user_id).await?;
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    pub async fn get(&self, match_id: &str) -> Result<Option<Match>> {
        let matches = self.store.list_matches().await?;
        Ok(matches.into_iter().find(|m| m.id == match_id))
    }

    /// Everyone the user is already matched with
    pub async fn partner_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let matches = self.matches_for(user_id).await?;
        Ok(matches
            .iter()
            .filter_map(|m| m.partner_of(user_id).map(str::to_string))
            .collect())
    }

    /// Clear the "new match" flag
    ///
    /// No write is issued when the match is already read.
    pub async fn mark_match_read(&self, match_id: &str) -> Result<Match> {
        let store = Arc::clone(&self.store);
        let lock = Arc::clone(&self.write_lock);
        let match_id = match_id.to_string();

        complete_write(async move {
            let _guard = lock.lock().await;

            let mut matches = store.list_matches().await?;
            let position = matches
                .iter()
                .position(|m| m.id == match_id)
                .ok_or_else(|| CoreError::UnknownMatch(match_id.clone()))?;

            if matches[position].read {
                return Ok(matches[position].clone());
            }

            matches[position].read = true;
            let updated = matches[position].clone();
            store.persist_matches(matches).await?;

            debug!("Marked match {} as read", match_id);
            Ok(updated)
        })
        .await
    }

    pub async fn health_check(&self) -> Result<bool> {
        Ok(self.store.health_check().await?)
    }
}
