// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{CandidateEntry, DirectMessage, Match, Message, Profile, Project, Role, ThreadKey, ThreadRecord};
pub use requests::{DecideRequest, ProjectThreadQuery, SendMessageRequest, ViewerQuery, ViewerRequest};
pub use responses::{
    DecisionResponse, DeckResponse, DirectThreadResponse, ErrorResponse, HealthResponse, MarkReadResponse,
    MatchesResponse, ThreadResponse,
};
