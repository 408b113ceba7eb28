use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::{filters::build_queue, ledger::MatchLedger};
use crate::error::{CoreError, Result};
use crate::models::{CandidateEntry, Match, Profile};
use crate::services::ProfileDirectory;

/// What the viewer did with the current candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Like,
    Pass,
}

/// Deck lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum DeckState {
    Loading,
    Ready { queue: Vec<CandidateEntry>, cursor: usize },
    Exhausted,
}

/// Result of a single decision
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub candidate: CandidateEntry,
    pub direction: Direction,
    pub created_match: Option<Match>,
}

/// A viewer's discovery deck
///
/// Walks the scored candidate queue one decision at a time. A like creates
/// the match before the cursor moves, so a failed write leaves the viewer on
/// the same candidate. `decide` takes `&mut self`, which keeps decisions
/// strictly sequential for a given deck.
pub struct DiscoveryDeck {
    viewer: Profile,
    directory: Arc<dyn ProfileDirectory>,
    ledger: MatchLedger,
    state: DeckState,
}

impl DiscoveryDeck {
    pub fn new(viewer: Profile, directory: Arc<dyn ProfileDirectory>, ledger: MatchLedger) -> Self {
        Self {
            viewer,
            directory,
            ledger,
            state: DeckState::Loading,
        }
    }

    /// Create a deck and load it straight away
    pub async fn load(viewer: Profile, directory: Arc<dyn ProfileDirectory>, ledger: MatchLedger) -> Result<Self> {
        let mut deck = Self::new(viewer, directory, ledger);
        deck.refresh().await?;
        Ok(deck)
    }

    pub fn viewer(&self) -> &Profile {
        &self.viewer
    }

    pub fn state(&self) -> &DeckState {
        &self.state
    }

    /// Swap in the viewer's latest profile; takes effect on the next refresh
    pub fn set_viewer(&mut self, viewer: Profile) -> Result<()> {
        if viewer.id != self.viewer.id {
            return Err(CoreError::InvalidPair(format!(
                "deck belongs to {}, not {}",
                self.viewer.id, viewer.id
            )));
        }
        self.viewer = viewer;
        Ok(())
    }

    /// Rebuild the queue from the directory and ledger, cursor back to 0
    pub async fn refresh(&mut self) -> Result<()> {
        let profiles = self.directory.list_profiles().await?;
        let matches = self.ledger_matches().await?;

        let total = profiles.len();
        let queue = build_queue(&self.viewer, profiles, &matches);

        info!(
            "Deck for {} rebuilt: {} candidates (from {} profiles)",
            self.viewer.id,
            queue.len(),
            total
        );

        self.state = if queue.is_empty() {
            DeckState::Exhausted
        } else {
            DeckState::Ready { queue, cursor: 0 }
        };
        Ok(())
    }

    /// Candidate under the cursor
    pub fn current(&self) -> Result<&CandidateEntry> {
        match &self.state {
            DeckState::Loading => Err(CoreError::DeckNotLoaded),
            DeckState::Ready { queue, cursor } => queue.get(*cursor).ok_or(CoreError::DeckExhausted),
            DeckState::Exhausted => Err(CoreError::DeckExhausted),
        }
    }

    /// Candidates not yet decided on, the current one included
    pub fn remaining(&self) -> usize {
        match &self.state {
            DeckState::Ready { queue, cursor } => queue.len().saturating_sub(*cursor),
            _ => 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, DeckState::Exhausted)
    }

    /// Decide on the current candidate and move on
    ///
    /// A like creates (or returns) the match with the candidate. Deciding on
    /// an exhausted deck fails with `DeckExhausted`.
    pub async fn decide(&mut self, direction: Direction) -> Result<DecisionOutcome> {
        let candidate = self.current()?.clone();

        let created_match = match direction {
            Direction::Like => Some(self.ledger.create_match(&self.viewer.id, &candidate.profile.id).await?),
            Direction::Pass => None,
        };

        debug!(
            "Viewer {} decided {:?} on {} (score {:.1})",
            self.viewer.id, direction, candidate.profile.id, candidate.score
        );

        self.advance();

        Ok(DecisionOutcome {
            candidate,
            direction,
            created_match,
        })
    }

    fn advance(&mut self) {
        if let DeckState::Ready { queue, cursor } = &mut self.state {
            *cursor += 1;
            if *cursor >= queue.len() {
                debug!("Deck for {} exhausted", self.viewer.id);
                self.state = DeckState::Exhausted;
            }
        }
    }

    async fn ledger_matches(&self) -> Result<Vec<Match>> {
        self.ledger.matches_for(&self.viewer.id).await
    }
}

/// Open a loaded deck over a shared ledger
///
/// Every deck writing to the same match collection must go through the same
/// ledger, which holds that collection's write lock.
pub async fn open_deck(
    viewer: Profile,
    directory: Arc<dyn ProfileDirectory>,
    ledger: &MatchLedger,
) -> Result<DiscoveryDeck> {
    DiscoveryDeck::load(viewer, directory, ledger.clone()).await
}
