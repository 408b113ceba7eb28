//! Riffmatch - discovery deck, matching and messaging for musicians
//!
//! This library provides the core used by the Riff collaboration app: a
//! scored discovery deck, the match ledger, and match and project message
//! threads, all over pluggable storage.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{score, Direction, DiscoveryDeck, MatchLedger, MatchThreads, ProjectThreads};
pub use error::{CoreError, ErrorKind, Result};
pub use models::{CandidateEntry, DirectMessage, Match, Message, Profile, Project, Role, ThreadKey};
