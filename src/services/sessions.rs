use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::core::{DecisionOutcome, Direction, DiscoveryDeck, MatchLedger};
use crate::error::{CoreError, Result};
use crate::models::Profile;
use crate::services::ProfileDirectory;

pub type SharedDeck = Arc<Mutex<DiscoveryDeck>>;

/// Per-viewer discovery decks kept between requests
///
/// Decks idle longer than the TTL are dropped and rebuilt on next use.
/// Each deck sits behind its own async mutex: a decision or refresh that
/// arrives while another one holds the deck is rejected with
/// `DecisionInFlight` instead of waiting.
pub struct DeckSessions {
    decks: Cache<String, SharedDeck>,
    directory: Arc<dyn ProfileDirectory>,
    ledger: MatchLedger,
}

impl DeckSessions {
    pub fn new(directory: Arc<dyn ProfileDirectory>, ledger: MatchLedger, max_sessions: u64, ttl_secs: u64) -> Self {
        let decks = Cache::builder()
            .max_capacity(max_sessions)
            .time_to_idle(Duration::from_secs(ttl_secs))
            .build();

        Self {
            decks,
            directory,
            ledger,
        }
    }

    /// The viewer's deck, built on first use
    pub async fn open(&self, viewer: &Profile) -> Result<SharedDeck> {
        let directory = Arc::clone(&self.directory);
        let ledger = self.ledger.clone();
        let owner = viewer.clone();

        self.decks
            .try_get_with(viewer.id.clone(), async move {
                let deck = DiscoveryDeck::load(owner, directory, ledger).await?;
                Ok::<_, CoreError>(Arc::new(Mutex::new(deck)))
            })
            .await
            .map_err(|e| {
                tracing::warn!("Failed to open deck for {}: {}", viewer.id, e);
                Arc::try_unwrap(e).unwrap_or_else(|shared| (*shared).clone())
            })
    }

    /// Decide on the viewer's current candidate
    pub async fn decide(&self, viewer: &Profile, direction: Direction) -> Result<(DecisionOutcome, SharedDeck)> {
        let deck = self.open(viewer).await?;
        let outcome = {
            let mut guard = deck
                .try_lock()
                .map_err(|_| CoreError::DecisionInFlight(viewer.id.clone()))?;
            guard.decide(direction).await?
        };
        Ok((outcome, deck))
    }

    /// Rebuild the viewer's deck from scratch, scored against `viewer` as given
    pub async fn refresh(&self, viewer: &Profile) -> Result<SharedDeck> {
        let deck = self.open(viewer).await?;
        {
            let mut guard = deck
                .try_lock()
                .map_err(|_| CoreError::DecisionInFlight(viewer.id.clone()))?;
            guard.set_viewer(viewer.clone())?;
            guard.refresh().await?;
        }
        Ok(deck)
    }

    pub async fn close(&self, viewer_id: &str) {
        self.decks.invalidate(viewer_id).await;
    }

    pub fn active_sessions(&self) -> u64 {
        self.decks.entry_count()
    }
}
