//! Poll actions: create, vote, retract, close.

use chrono::{DateTime, Utc};
use serde_json::json;

use hearth_common::ApiError;
use hearth_model::{
    EntityKind, Message, MessageId, OptionId, Poll, PollId, PollKind, PollOption, PollStatus,
    PollVote, Record, VoteError, VoteId,
};

use crate::actions::ops;
use crate::client::HearthClient;
use crate::mutation::{MutationPlan, Reconcile};
use crate::transport::{ApiCall, CancelToken};

#[derive(Debug, Clone)]
pub struct PollOptionDraft {
    pub text: String,
    pub event_date: Option<DateTime<Utc>>,
}

/// A new poll, attached to an existing message.
#[derive(Debug, Clone)]
pub struct PollDraft {
    pub message_id: MessageId,
    pub question: String,
    pub kind: PollKind,
    pub ends_at: Option<DateTime<Utc>>,
    pub options: Vec<PollOptionDraft>,
}

impl HearthClient {
    /// Create a poll on a message. Speculatively writes both the poll and
    /// the message's `poll_id` reference; after the reply, the message is
    /// repointed at the authoritative poll id.
    pub async fn create_poll(
        &self,
        draft: PollDraft,
        cancel: Option<&CancelToken>,
    ) -> Result<Poll, ApiError> {
        let message = self
            .store()
            .read(|s| s.of::<Message>().get(draft.message_id.as_str()).cloned())
            .ok_or_else(|| self.reject(ops::POLLS_CREATE, ApiError::not_found("message")))?;

        let temp_id = PollId::temp(self.next_temp());
        let speculative = Poll {
            id: temp_id.clone(),
            message_id: draft.message_id.clone(),
            question: draft.question.clone(),
            kind: draft.kind,
            status: PollStatus::Open,
            ends_at: draft.ends_at,
            options: draft
                .options
                .iter()
                .map(|option| PollOption {
                    id: OptionId::temp(self.next_temp()),
                    text: option.text.clone(),
                    event_date: option.event_date,
                    votes: Vec::new(),
                })
                .collect(),
        };

        let call = ApiCall::new(
            "polls",
            "create",
            json!({
                "message_id": draft.message_id,
                "question": draft.question,
                "kind": draft.kind,
                "ends_at": draft.ends_at,
                "options": draft.options.iter().map(|o| json!({
                    "text": o.text,
                    "event_date": o.event_date,
                })).collect::<Vec<_>>(),
            }),
        );
        let plan = MutationPlan::new(ops::POLLS_CREATE, call)
            .speculate(speculative.into_entity())
            .speculate(message.clone().with_poll(temp_id.clone()).into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Poll,
                temp_id: Some(temp_id.into_string()),
            });

        let reply = self.mutator().run(plan, cancel).await?;
        let poll: Poll = reply.decode()?;

        // Repoint the message at the server-issued poll id; the speculative
        // copy still references the temporary one.
        self.store().write(|store| {
            if let Some(current) = store.of::<Message>().get(poll.message_id.as_str()).cloned() {
                store.upsert(current.with_poll(poll.id.clone()).into_entity());
            }
        });

        Ok(poll)
    }

    /// Vote on a poll. The option's vote set (and derived count) updates
    /// immediately; a conflict reply ("already voted") restores it verbatim.
    pub async fn vote(
        &self,
        poll_id: &PollId,
        option_id: &OptionId,
        rank: Option<u32>,
    ) -> Result<Poll, ApiError> {
        let user = self.require_user()?;
        let current = self
            .store()
            .read(|s| s.of::<Poll>().get(poll_id.as_str()).cloned())
            .ok_or_else(|| self.reject(ops::POLLS_VOTE, ApiError::not_found("poll")))?;

        let vote = PollVote {
            id: VoteId::temp(self.next_temp()),
            user_id: user,
            rank,
        };
        let speculative = current.with_vote(option_id, vote).map_err(|e| {
            let err = match e {
                VoteError::AlreadyVoted => ApiError::conflict(e.to_string()),
                _ => ApiError::validation(e.to_string()),
            };
            self.reject(ops::POLLS_VOTE, err)
        })?;

        let call = ApiCall::new(
            "polls",
            "vote",
            json!({ "id": poll_id, "option_id": option_id, "rank": rank }),
        );
        let plan = MutationPlan::new(ops::POLLS_VOTE, call)
            .speculate(speculative.into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Poll,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Poll>()
    }

    /// Retract every vote the current user has cast on this poll.
    pub async fn retract_vote(&self, poll_id: &PollId) -> Result<Poll, ApiError> {
        let user = self.require_user()?;
        let current = self
            .store()
            .read(|s| s.of::<Poll>().get(poll_id.as_str()).cloned())
            .ok_or_else(|| self.reject(ops::POLLS_RETRACT, ApiError::not_found("poll")))?;

        let call = ApiCall::new("polls", "retract", json!({ "id": poll_id }));
        let plan = MutationPlan::new(ops::POLLS_RETRACT, call)
            .speculate(current.without_votes_from(&user).into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Poll,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Poll>()
    }

    pub async fn close_poll(&self, poll_id: &PollId) -> Result<Poll, ApiError> {
        let current = self
            .store()
            .read(|s| s.of::<Poll>().get(poll_id.as_str()).cloned())
            .ok_or_else(|| self.reject(ops::POLLS_CLOSE, ApiError::not_found("poll")))?;

        if !current.is_open() {
            return Err(self.reject(ops::POLLS_CLOSE, ApiError::conflict("poll is closed")));
        }

        let call = ApiCall::new("polls", "close", json!({ "id": poll_id }));
        let plan = MutationPlan::new(ops::POLLS_CLOSE, call)
            .speculate(current.closed().into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Poll,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Poll>()
    }
}
