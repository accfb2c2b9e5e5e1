//! Message actions: fetch, create, edit, soft-delete, reactions, read
//! receipts.

use chrono::Utc;
use serde_json::json;

use hearth_common::{ApiError, PageQuery};
use hearth_model::{
    Attachment, EntityKind, ListKey, Mention, MentionId, Message, MessageId, Reaction,
    ReactionId, ReactionKind, ReadReceipts, Record, ThreadId, UserId,
};

use crate::actions::ops;
use crate::client::HearthClient;
use crate::mutation::{MutationPlan, Reconcile};
use crate::transport::{ApiCall, CancelToken};

/// A new message as submitted by the composer.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub thread_id: ThreadId,
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub mentions: Vec<UserId>,
}

impl MessageDraft {
    pub fn text(thread_id: ThreadId, content: impl Into<String>) -> Self {
        Self {
            thread_id,
            content: content.into(),
            attachments: Vec::new(),
            mentions: Vec::new(),
        }
    }
}

impl HearthClient {
    pub async fn fetch_messages(
        &self,
        thread_id: &ThreadId,
        query: PageQuery,
    ) -> Result<Vec<Message>, ApiError> {
        let call = ApiCall::new("messages", "list", json!({ "thread_id": thread_id }));
        self.fetch_page::<Message>(ops::MESSAGES_LIST, call, &ListKey::parent(thread_id), query)
            .await
    }

    /// Create a message. The speculative copy is visible in the thread
    /// immediately under a temporary id; the server reply substitutes the
    /// authoritative id in place.
    pub async fn create_message(
        &self,
        draft: MessageDraft,
        cancel: Option<&CancelToken>,
    ) -> Result<Message, ApiError> {
        let author = self.require_user()?;
        let now = Utc::now();
        let temp_id = MessageId::temp(self.next_temp());

        let mentions: Vec<Mention> = draft
            .mentions
            .iter()
            .map(|user_id| Mention {
                id: MentionId::temp(self.next_temp()),
                user_id: user_id.clone(),
                mentioned_at: now,
            })
            .collect();

        let speculative = Message {
            id: temp_id.clone(),
            thread_id: draft.thread_id.clone(),
            author_id: author,
            content: draft.content.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            attachments: draft.attachments.clone(),
            reactions: Vec::new(),
            mentions,
            poll_id: None,
            receipts: ReadReceipts::default(),
        };

        let call = ApiCall::new(
            "messages",
            "create",
            json!({
                "thread_id": draft.thread_id,
                "content": draft.content,
                "attachments": draft.attachments,
                "mentions": draft.mentions,
            }),
        );
        let plan = MutationPlan::new(ops::MESSAGES_CREATE, call)
            .speculate(speculative.into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Message,
                temp_id: Some(temp_id.into_string()),
            });

        let reply = self.mutator().run(plan, cancel).await?;
        reply.decode::<Message>()
    }

    pub async fn edit_message(
        &self,
        id: &MessageId,
        content: impl Into<String>,
    ) -> Result<Message, ApiError> {
        let content = content.into();
        let current = self
            .store()
            .read(|s| s.of::<Message>().get(id.as_str()).cloned())
            .ok_or_else(|| self.reject(ops::MESSAGES_UPDATE, ApiError::not_found("message")))?;

        let call = ApiCall::new("messages", "update", json!({ "id": id, "content": content }));
        let plan = MutationPlan::new(ops::MESSAGES_UPDATE, call)
            .speculate(current.with_content(content, Utc::now()).into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Message,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Message>()
    }

    /// Soft delete: the message keeps its position as a tombstone. The server
    /// reply carries the authoritative tombstone.
    pub async fn delete_message(&self, id: &MessageId) -> Result<Message, ApiError> {
        let current = self
            .store()
            .read(|s| s.of::<Message>().get(id.as_str()).cloned())
            .ok_or_else(|| self.reject(ops::MESSAGES_DELETE, ApiError::not_found("message")))?;

        let call = ApiCall::new("messages", "delete", json!({ "id": id }));
        let plan = MutationPlan::new(ops::MESSAGES_DELETE, call)
            .speculate(current.with_deleted(Utc::now()).into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Message,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Message>()
    }

    pub async fn add_reaction(
        &self,
        message_id: &MessageId,
        emoji: impl Into<String>,
        kind: ReactionKind,
    ) -> Result<Message, ApiError> {
        let user = self.require_user()?;
        let emoji = emoji.into();
        let current = self
            .store()
            .read(|s| s.of::<Message>().get(message_id.as_str()).cloned())
            .ok_or_else(|| self.reject(ops::MESSAGES_REACT, ApiError::not_found("message")))?;

        let reaction = Reaction {
            id: ReactionId::temp(self.next_temp()),
            user_id: user,
            emoji: emoji.clone(),
            kind,
        };
        let call = ApiCall::new(
            "messages",
            "react",
            json!({ "id": message_id, "emoji": emoji, "kind": kind }),
        );
        let plan = MutationPlan::new(ops::MESSAGES_REACT, call)
            .speculate(current.with_reaction(reaction).into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Message,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Message>()
    }

    pub async fn remove_reaction(
        &self,
        message_id: &MessageId,
        reaction_id: &ReactionId,
    ) -> Result<Message, ApiError> {
        let current = self
            .store()
            .read(|s| s.of::<Message>().get(message_id.as_str()).cloned())
            .ok_or_else(|| self.reject(ops::MESSAGES_UNREACT, ApiError::not_found("message")))?;

        let call = ApiCall::new(
            "messages",
            "unreact",
            json!({ "id": message_id, "reaction_id": reaction_id }),
        );
        let plan = MutationPlan::new(ops::MESSAGES_UNREACT, call)
            .speculate(current.without_reaction(reaction_id).into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Message,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Message>()
    }

    /// Mark a message read by the current user.
    pub async fn mark_read(&self, message_id: &MessageId) -> Result<Message, ApiError> {
        let user = self.require_user()?;
        let current = self
            .store()
            .read(|s| s.of::<Message>().get(message_id.as_str()).cloned())
            .ok_or_else(|| self.reject(ops::MESSAGES_MARK_READ, ApiError::not_found("message")))?;

        if current.receipts.is_read_by(&user) {
            // Nothing to do; avoid a no-op round trip.
            return Ok(current);
        }

        let call = ApiCall::new("messages", "mark_read", json!({ "id": message_id }));
        let plan = MutationPlan::new(ops::MESSAGES_MARK_READ, call)
            .speculate(current.mark_read_by(&user).into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Message,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Message>()
    }
}
