use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{
    AttachmentId, MentionId, MessageId, PollId, ReactionId, ThreadId, UserId,
};

/// A file attached to a message. The attachment transport (upload/download)
/// is external; the store only carries the resolved reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub url: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    /// A standard unicode emoji reaction.
    Emoji,
    /// A household-defined custom reaction.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: ReactionId,
    pub user_id: UserId,
    pub emoji: String,
    pub kind: ReactionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub id: MentionId,
    pub user_id: UserId,
    pub mentioned_at: DateTime<Utc>,
}

/// Read-receipt summary: who has read the message and who has not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipts {
    pub read_by: Vec<UserId>,
    pub unread_by: Vec<UserId>,
}

impl ReadReceipts {
    pub fn is_read_by(&self, user: &UserId) -> bool {
        self.read_by.contains(user)
    }

    /// Move `user` from the unread set to the read set. Idempotent.
    pub fn mark_read(mut self, user: &UserId) -> Self {
        self.unread_by.retain(|u| u != user);
        if !self.read_by.contains(user) {
            self.read_by.push(user.clone());
        }
        self
    }
}

/// One message in a thread.
///
/// Soft-deleted messages keep their position and metadata; `deleted_at`
/// marks them and UI renders a tombstone. A hard remove only ever comes from
/// the server as a delete event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub thread_id: ThreadId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub mentions: Vec<Mention>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_id: Option<PollId>,
    #[serde(default)]
    pub receipts: ReadReceipts,
}

impl Message {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn with_content(mut self, content: impl Into<String>, edited_at: DateTime<Utc>) -> Self {
        self.content = content.into();
        self.updated_at = edited_at;
        self
    }

    pub fn with_deleted(mut self, at: DateTime<Utc>) -> Self {
        self.deleted_at = Some(at);
        self.updated_at = at;
        self
    }

    pub fn with_reaction(mut self, reaction: Reaction) -> Self {
        self.reactions.push(reaction);
        self
    }

    pub fn without_reaction(mut self, reaction_id: &ReactionId) -> Self {
        self.reactions.retain(|r| &r.id != reaction_id);
        self
    }

    pub fn with_poll(mut self, poll_id: PollId) -> Self {
        self.poll_id = Some(poll_id);
        self
    }

    pub fn mark_read_by(mut self, user: &UserId) -> Self {
        self.receipts = self.receipts.mark_read(user);
        self
    }
}
