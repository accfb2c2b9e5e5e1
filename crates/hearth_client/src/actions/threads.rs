//! Thread actions: fetch, create, rename, delete, participants.

use chrono::Utc;
use serde_json::json;

use hearth_common::{ApiError, PageQuery};
use hearth_model::{
    EntityKind, EntityRef, HouseholdId, ListKey, MemberId, Participant, Record, Thread, ThreadId,
};

use crate::actions::ops;
use crate::client::HearthClient;
use crate::mutation::{MutationPlan, Reconcile};
use crate::transport::{ApiCall, CancelToken};

/// A new thread as submitted by the UI.
#[derive(Debug, Clone)]
pub struct ThreadDraft {
    pub household_id: HouseholdId,
    pub title: String,
    /// Members invited to participate from the start.
    pub participants: Vec<MemberId>,
}

impl HearthClient {
    pub async fn fetch_threads(
        &self,
        household_id: &HouseholdId,
        query: PageQuery,
    ) -> Result<Vec<Thread>, ApiError> {
        let call = ApiCall::new("threads", "list", json!({ "household_id": household_id }));
        self.fetch_page::<Thread>(ops::THREADS_LIST, call, &ListKey::parent(household_id), query)
            .await
    }

    pub async fn create_thread(
        &self,
        draft: ThreadDraft,
        cancel: Option<&CancelToken>,
    ) -> Result<Thread, ApiError> {
        let author = self.require_user()?;
        let now = Utc::now();
        let temp_id = ThreadId::temp(self.next_temp());

        let speculative = Thread {
            id: temp_id.clone(),
            household_id: draft.household_id.clone(),
            author_id: author,
            title: draft.title.clone(),
            created_at: now,
            updated_at: now,
            participants: draft
                .participants
                .iter()
                .map(|member_id| Participant::invited(member_id.clone(), now))
                .collect(),
        };

        let call = ApiCall::new(
            "threads",
            "create",
            json!({
                "household_id": draft.household_id,
                "title": draft.title,
                "participants": draft.participants,
            }),
        );
        let plan = MutationPlan::new(ops::THREADS_CREATE, call)
            .speculate(speculative.into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Thread,
                temp_id: Some(temp_id.into_string()),
            });

        let reply = self.mutator().run(plan, cancel).await?;
        reply.decode::<Thread>()
    }

    pub async fn rename_thread(
        &self,
        id: &ThreadId,
        title: impl Into<String>,
    ) -> Result<Thread, ApiError> {
        let title = title.into();
        let current = self
            .store()
            .read(|s| s.of::<Thread>().get(id.as_str()).cloned())
            .ok_or_else(|| self.reject(ops::THREADS_RENAME, ApiError::not_found("thread")))?;

        let call = ApiCall::new("threads", "rename", json!({ "id": id, "title": title }));
        let plan = MutationPlan::new(ops::THREADS_RENAME, call)
            .speculate(current.with_title(title, Utc::now()).into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Thread,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Thread>()
    }

    /// Hard delete: the thread disappears from its household list
    /// immediately and is restored verbatim if the server refuses.
    pub async fn delete_thread(&self, id: &ThreadId) -> Result<(), ApiError> {
        let target = EntityRef::new(EntityKind::Thread, id.as_str());
        let call = ApiCall::new("threads", "delete", json!({ "id": id }));
        let plan = MutationPlan::new(ops::THREADS_DELETE, call)
            .remove(target.clone())
            .reconcile(Reconcile::Removal(target));

        self.mutator().run(plan, None).await?;
        Ok(())
    }

    pub async fn add_participant(
        &self,
        thread_id: &ThreadId,
        member_id: &MemberId,
    ) -> Result<Thread, ApiError> {
        let current = self
            .store()
            .read(|s| s.of::<Thread>().get(thread_id.as_str()).cloned())
            .ok_or_else(|| {
                self.reject(ops::THREADS_ADD_PARTICIPANT, ApiError::not_found("thread"))
            })?;

        let call = ApiCall::new(
            "threads",
            "add_participant",
            json!({ "id": thread_id, "member_id": member_id }),
        );
        let plan = MutationPlan::new(ops::THREADS_ADD_PARTICIPANT, call)
            .speculate(
                current
                    .with_participant(Participant::invited(member_id.clone(), Utc::now()))
                    .into_entity(),
            )
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Thread,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Thread>()
    }

    /// Accept or reject a thread invitation for `member_id`.
    pub async fn respond_participation(
        &self,
        thread_id: &ThreadId,
        member_id: &MemberId,
        accept: bool,
    ) -> Result<Thread, ApiError> {
        let current = self
            .store()
            .read(|s| s.of::<Thread>().get(thread_id.as_str()).cloned())
            .ok_or_else(|| self.reject(ops::THREADS_RESPOND, ApiError::not_found("thread")))?;
        let participant = current
            .participant(member_id)
            .cloned()
            .ok_or_else(|| self.reject(ops::THREADS_RESPOND, ApiError::not_found("participant")))?;
        let responded = participant
            .respond(accept, Utc::now())
            .map_err(|e| self.reject(ops::THREADS_RESPOND, ApiError::validation(e.to_string())))?;

        let call = ApiCall::new(
            "threads",
            "respond",
            json!({ "id": thread_id, "member_id": member_id, "accept": accept }),
        );
        let plan = MutationPlan::new(ops::THREADS_RESPOND, call)
            .speculate(current.with_participant(responded).into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Thread,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Thread>()
    }
}
