use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Musical role a profile is registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Producer,
    Vocalist,
    Songwriter,
    Instrumentalist,
    Mixer,
    #[serde(rename = "a&r")]
    AandR,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Vocalist => "vocalist",
            Role::Songwriter => "songwriter",
            Role::Instrumentalist => "instrumentalist",
            Role::Mixer => "mixer",
            Role::AandR => "a&r",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Musician profile as published by the profile directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    pub role: Role,
    #[serde(default)]
    pub genres: BTreeSet<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub highlight_count: u32,
    #[serde(default)]
    pub onboarded: bool,
}

/// A profile in a viewer's deck together with its compatibility score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEntry {
    pub profile: Profile,
    pub score: f64,
}

/// Persisted link between two users, created by a like
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub user_a: String,
    pub user_b: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Match {
    /// True if `user_id` occupies either slot
    pub fn involves(&self, user_id: &str) -> bool {
        self.user_a == user_id || self.user_b == user_id
    }

    /// True if this match links exactly `x` and `y`, in either order
    pub fn pairs(&self, x: &str, y: &str) -> bool {
        (self.user_a == x && self.user_b == y) || (self.user_a == y && self.user_b == x)
    }

    /// The other participant, if `user_id` is one of the pair
    pub fn partner_of(&self, user_id: &str) -> Option<&str> {
        if self.user_a == user_id {
            Some(&self.user_b)
        } else if self.user_b == user_id {
            Some(&self.user_a)
        } else {
            None
        }
    }
}

/// Collaboration project owned by the project directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub owner_id: String,
}

/// Identifies one conversation
///
/// Project threads store the participant pair sorted, so both sides resolve
/// to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ThreadKey {
    Match {
        #[serde(rename = "matchId")]
        match_id: String,
    },
    Project {
        #[serde(rename = "projectId")]
        project_id: String,
        low: String,
        high: String,
    },
}

impl ThreadKey {
    pub fn for_match(match_id: impl Into<String>) -> Self {
        ThreadKey::Match {
            match_id: match_id.into(),
        }
    }

    pub fn for_project(project_id: impl Into<String>, a: &str, b: &str) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        ThreadKey::Project {
            project_id: project_id.into(),
            low: low.to_string(),
            high: high.to_string(),
        }
    }

    /// True if the key can address a conversation at all
    pub fn is_well_formed(&self) -> bool {
        match self {
            ThreadKey::Match { match_id } => !match_id.trim().is_empty(),
            ThreadKey::Project {
                project_id,
                low,
                high,
            } => !project_id.trim().is_empty() && !low.is_empty() && !high.is_empty() && low != high,
        }
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadKey::Match { match_id } => write!(f, "match:{}", match_id),
            ThreadKey::Project {
                project_id,
                low,
                high,
            } => write!(f, "project:{}:{}:{}", project_id, low, high),
        }
    }
}

/// Chat message inside a match thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub match_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// Chat message between two collaborators on a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub id: String,
    pub project_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub sender_name: String,
    pub receiver_name: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// Common view over both message kinds, used by the thread engine
pub trait ThreadRecord: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
    fn thread_key(&self) -> ThreadKey;
    fn sender_id(&self) -> &str;
    fn receiver_id(&self) -> &str;
    fn sent_at(&self) -> DateTime<Utc>;
    fn is_read(&self) -> bool;
    fn mark_read(&mut self);

    fn belongs_to(&self, key: &ThreadKey) -> bool {
        &self.thread_key() == key
    }
}

impl ThreadRecord for Message {
    fn id(&self) -> &str {
        &self.id
    }

    fn thread_key(&self) -> ThreadKey {
        ThreadKey::for_match(self.match_id.clone())
    }

    fn sender_id(&self) -> &str {
        &self.sender_id
    }

    fn receiver_id(&self) -> &str {
        &self.receiver_id
    }

    fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    fn is_read(&self) -> bool {
        self.read
    }

    fn mark_read(&mut self) {
        self.read = true;
    }

    fn belongs_to(&self, key: &ThreadKey) -> bool {
        matches!(key, ThreadKey::Match { match_id } if *match_id == self.match_id)
    }
}

impl ThreadRecord for DirectMessage {
    fn id(&self) -> &str {
        &self.id
    }

    fn thread_key(&self) -> ThreadKey {
        ThreadKey::for_project(self.project_id.clone(), &self.sender_id, &self.receiver_id)
    }

    fn sender_id(&self) -> &str {
        &self.sender_id
    }

    fn receiver_id(&self) -> &str {
        &self.receiver_id
    }

    fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    fn is_read(&self) -> bool {
        self.read
    }

    fn mark_read(&mut self) {
        self.read = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::AandR).unwrap(), "\"a&r\"");
        let role: Role = serde_json::from_str("\"instrumentalist\"").unwrap();
        assert_eq!(role, Role::Instrumentalist);
    }

    #[test]
    fn test_project_key_is_order_independent() {
        let a = ThreadKey::for_project("p1", "u2", "u1");
        let b = ThreadKey::for_project("p1", "u1", "u2");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "project:p1:u1:u2");
    }

    #[test]
    fn test_malformed_keys() {
        assert!(!ThreadKey::for_match("  ").is_well_formed());
        assert!(!ThreadKey::for_project("p1", "u1", "u1").is_well_formed());
        assert!(!ThreadKey::for_project("", "u1", "u2").is_well_formed());
        assert!(ThreadKey::for_match("m1").is_well_formed());
    }

    #[test]
    fn test_match_partner_lookup() {
        let record = Match {
            id: "m1".to_string(),
            user_a: "u1".to_string(),
            user_b: "u2".to_string(),
            created_at: Utc::now(),
            read: false,
        };
        assert!(record.pairs("u2", "u1"));
        assert_eq!(record.partner_of("u1"), Some("u2"));
        assert_eq!(record.partner_of("u3"), None);
    }

    #[test]
    fn test_profile_deserializes_with_defaults() {
        let json = r#"{"id":"u1","displayName":"Ana","role":"vocalist"}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert!(profile.genres.is_empty());
        assert!(!profile.onboarded);
        assert_eq!(profile.highlight_count, 0);
    }
}
