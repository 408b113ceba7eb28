use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::Direction;

/// Identifies the viewer on read-only endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ViewerQuery {
    #[validate(length(min = 1))]
    #[serde(alias = "viewer_id", rename = "viewerId")]
    pub viewer_id: String,
}

/// Body for deck refresh and read-marking endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ViewerRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "viewer_id", rename = "viewerId")]
    pub viewer_id: String,
}

/// Request to decide on the current deck candidate
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DecideRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "viewer_id", rename = "viewerId")]
    pub viewer_id: String,
    pub direction: Direction,
}

/// Request to send a message into a match or project thread
///
/// Content is checked by the messaging core, not here.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "viewer_id", rename = "viewerId")]
    pub viewer_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "receiver_id", rename = "receiverId")]
    pub receiver_id: String,
    pub content: String,
}

/// Identifies a project thread from one participant's side
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProjectThreadQuery {
    #[validate(length(min = 1))]
    #[serde(alias = "viewer_id", rename = "viewerId")]
    pub viewer_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "peer_id", rename = "peerId")]
    pub peer_id: String,
}
