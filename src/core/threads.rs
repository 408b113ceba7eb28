use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::core::ledger::MatchLedger;
use crate::core::messaging::Conversations;
use crate::error::{CoreError, Result};
use crate::models::{DirectMessage, Match, Message, Profile, ThreadKey};
use crate::services::ProjectDirectory;

/// One row of a viewer's inbox
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    #[serde(rename = "match")]
    pub matched: Match,
    pub partner_id: String,
    pub last_message: Option<Message>,
    pub unread: usize,
}

impl ConversationSummary {
    /// Time of the latest activity: last message, else match creation
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message
            .as_ref()
            .map(|m| m.sent_at)
            .unwrap_or(self.matched.created_at)
    }
}

/// Conversations scoped to a match
#[derive(Clone)]
pub struct MatchThreads {
    ledger: MatchLedger,
    conversations: Conversations<Message>,
}

impl MatchThreads {
    pub fn new(ledger: MatchLedger, conversations: Conversations<Message>) -> Self {
        Self { ledger, conversations }
    }

    /// Resolve a match that `sender` and `receiver` are the two sides of
    async fn resolve(&self, match_id: &str, sender_id: &str, receiver_id: &str) -> Result<Match> {
        let key = ThreadKey::for_match(match_id);
        if !key.is_well_formed() {
            return Err(CoreError::InvalidThreadKey(key.to_string()));
        }

        let record = self
            .ledger
            .get(match_id)
            .await?
            .ok_or_else(|| CoreError::InvalidThreadKey(format!("{} does not exist", key)))?;

        if sender_id == receiver_id || !record.pairs(sender_id, receiver_id) {
            return Err(CoreError::InvalidThreadKey(format!(
                "{} and {} are not the participants of {}",
                sender_id, receiver_id, key
            )));
        }
        Ok(record)
    }

    /// Send a message into a match thread
    pub async fn send_message(&self, match_id: &str, sender_id: &str, receiver_id: &str, content: &str) -> Result<Message> {
        self.conversations.validate(content)?;
        self.resolve(match_id, sender_id, receiver_id).await?;

        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            match_id: match_id.to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            sent_at: Utc::now(),
            read: false,
        };

        let sent = self.conversations.append(message).await?;
        info!("Message {} sent in match {} by {}", sent.id, match_id, sender_id);
        Ok(sent)
    }

    pub async fn thread_messages(&self, match_id: &str) -> Result<Vec<Message>> {
        self.conversations.thread_messages(&ThreadKey::for_match(match_id)).await
    }

    pub async fn mark_thread_read(&self, match_id: &str, reader_id: &str) -> Result<usize> {
        self.conversations
            .mark_thread_read(&ThreadKey::for_match(match_id), reader_id)
            .await
    }

    pub async fn unread_count(&self, match_id: &str, viewer_id: &str) -> Result<usize> {
        self.conversations
            .unread_count(&ThreadKey::for_match(match_id), viewer_id)
            .await
    }

    /// Inbox for a viewer: one summary per match, most recent activity first
    pub async fn conversations_for(&self, viewer_id: &str) -> Result<Vec<ConversationSummary>> {
        let matches = self.ledger.matches_for(viewer_id).await?;

        let mut summaries = Vec::with_capacity(matches.len());
        for matched in matches {
            let messages = self.thread_messages(&matched.id).await?;
            let unread = messages
                .iter()
                .filter(|m| m.receiver_id == viewer_id && !m.read)
                .count();
            let partner_id = matched.partner_of(viewer_id).unwrap_or_default().to_string();

            summaries.push(ConversationSummary {
                partner_id,
                last_message: messages.into_iter().last(),
                unread,
                matched,
            });
        }

        summaries.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));
        Ok(summaries)
    }

    pub fn ledger(&self) -> &MatchLedger {
        &self.ledger
    }
}

/// Conversations between two collaborators on a project
#[derive(Clone)]
pub struct ProjectThreads {
    projects: Arc<dyn ProjectDirectory>,
    conversations: Conversations<DirectMessage>,
}

impl ProjectThreads {
    pub fn new(projects: Arc<dyn ProjectDirectory>, conversations: Conversations<DirectMessage>) -> Self {
        Self { projects, conversations }
    }

    /// Send a direct message about a project
    ///
    /// Display names are copied from the two profiles at send time.
    pub async fn send_message(
        &self,
        project_id: &str,
        sender: &Profile,
        receiver: &Profile,
        content: &str,
    ) -> Result<DirectMessage> {
        self.conversations.validate(content)?;

        let key = ThreadKey::for_project(project_id, &sender.id, &receiver.id);
        if !key.is_well_formed() {
            return Err(CoreError::InvalidThreadKey(key.to_string()));
        }
        if self.projects.get_project(project_id).await?.is_none() {
            return Err(CoreError::InvalidThreadKey(format!("project {} does not exist", project_id)));
        }

        let message = DirectMessage {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            sender_id: sender.id.clone(),
            receiver_id: receiver.id.clone(),
            sender_name: sender.display_name.clone(),
            receiver_name: receiver.display_name.clone(),
            content: content.to_string(),
            sent_at: Utc::now(),
            read: false,
        };

        let sent = self.conversations.append(message).await?;
        info!("Direct message {} sent on project {} by {}", sent.id, project_id, sender.id);
        Ok(sent)
    }

    pub async fn thread_messages(&self, project_id: &str, a: &str, b: &str) -> Result<Vec<DirectMessage>> {
        self.conversations
            .thread_messages(&ThreadKey::for_project(project_id, a, b))
            .await
    }

    pub async fn mark_thread_read(&self, project_id: &str, reader_id: &str, peer_id: &str) -> Result<usize> {
        self.conversations
            .mark_thread_read(&ThreadKey::for_project(project_id, reader_id, peer_id), reader_id)
            .await
    }

    pub async fn unread_count(&self, project_id: &str, viewer_id: &str, peer_id: &str) -> Result<usize> {
        self.conversations
            .unread_count(&ThreadKey::for_project(project_id, viewer_id, peer_id), viewer_id)
            .await
    }
}
