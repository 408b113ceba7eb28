// Core algorithm exports
pub mod deck;
pub mod filters;
pub mod ledger;
pub mod messaging;
pub mod scoring;
pub mod threads;
pub mod viewer;
mod write;

pub use deck::{open_deck, DecisionOutcome, DeckState, Direction, DiscoveryDeck};
pub use filters::{build_queue, is_eligible, matched_partner_ids};
pub use ledger::MatchLedger;
pub use messaging::{validate_content, Conversations, MAX_MESSAGE_CHARS};
pub use scoring::{complements, score, score_breakdown, ScoreBreakdown};
pub use threads::{ConversationSummary, MatchThreads, ProjectThreads};
pub use viewer::{load_viewer, require_viewer};
