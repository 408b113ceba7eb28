// Service exports
pub mod appwrite;
pub mod memory;
pub mod postgres;
pub mod sessions;
pub mod store;

pub use appwrite::{AppwriteClient, AppwriteCollections, AppwriteError};
pub use memory::MemoryStore;
pub use postgres::{PostgresError, PostgresStore};
pub use sessions::DeckSessions;
pub use store::{MatchStore, MessageStore, ProfileDirectory, ProjectDirectory, StoreError};
