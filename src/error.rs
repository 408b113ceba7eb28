//! Error taxonomy for the matching and messaging core

use thiserror::Error;

use crate::services::StoreError;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// How a caller should react to a [`CoreError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fail fast, not retryable; usually needs a redirect (setup, new deck)
    Precondition,
    /// Re-prompt the user, other state is untouched
    Validation,
    /// Storage did not confirm; the side effect was not applied
    Persistence,
}

/// Errors surfaced by the scorer, deck, ledger and messaging subsystem
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("No current viewer: profile missing or not onboarded")]
    NoCurrentViewer,

    #[error("Deck has not been loaded yet")]
    DeckNotLoaded,

    #[error("Deck exhausted: no candidate left to decide on")]
    DeckExhausted,

    #[error("Another decision is still in flight for viewer {0}")]
    DecisionInFlight(String),

    #[error("Invalid thread key: {0}")]
    InvalidThreadKey(String),

    #[error("Invalid pair: {0}")]
    InvalidPair(String),

    #[error("Unknown match: {0}")]
    UnknownMatch(String),

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Message too long: {length} characters (max {max})")]
    MessageTooLong { length: usize, max: usize },

    #[error("Storage error: {0}")]
    Persistence(#[from] StoreError),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::EmptyMessage | CoreError::MessageTooLong { .. } => ErrorKind::Validation,
            CoreError::Persistence(_) => ErrorKind::Persistence,
            _ => ErrorKind::Precondition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(CoreError::DeckExhausted.kind(), ErrorKind::Precondition);
        assert_eq!(CoreError::NoCurrentViewer.kind(), ErrorKind::Precondition);
        assert_eq!(CoreError::EmptyMessage.kind(), ErrorKind::Validation);
        assert_eq!(
            CoreError::MessageTooLong { length: 501, max: 500 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CoreError::Persistence(StoreError::Unavailable("down".into())).kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn test_error_messages() {
        let err = CoreError::MessageTooLong { length: 501, max: 500 };
        assert_eq!(err.to_string(), "Message too long: 501 characters (max 500)");
    }
}
