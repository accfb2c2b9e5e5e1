//! Household and membership actions.

use chrono::Utc;
use serde_json::json;

use hearth_common::{ApiError, PageQuery};
use hearth_model::{
    EntityKind, Household, HouseholdId, ListKey, Member, MemberId, MemberRole, Record,
    TransitionError, UserId,
};

use crate::actions::ops;
use crate::client::HearthClient;
use crate::mutation::{MutationPlan, Reconcile};
use crate::transport::ApiCall;

/// Parameters for inviting a user into a household.
#[derive(Debug, Clone)]
pub struct MemberInvite {
    pub household_id: HouseholdId,
    pub user_id: UserId,
    pub display_name: String,
    pub role: MemberRole,
}

impl HearthClient {
    pub async fn fetch_households(&self, query: PageQuery) -> Result<Vec<Household>, ApiError> {
        let call = ApiCall::new("households", "list", json!({}));
        self.fetch_page::<Household>(ops::HOUSEHOLDS_LIST, call, &ListKey::root(), query)
            .await
    }

    pub async fn fetch_members(
        &self,
        household_id: &HouseholdId,
        query: PageQuery,
    ) -> Result<Vec<Member>, ApiError> {
        let call = ApiCall::new("members", "list", json!({ "household_id": household_id }));
        self.fetch_page::<Member>(ops::MEMBERS_LIST, call, &ListKey::parent(household_id), query)
            .await
    }

    pub async fn invite_member(&self, invite: MemberInvite) -> Result<Member, ApiError> {
        self.require_user()?;
        let temp_id = MemberId::temp(self.next_temp());
        let speculative = Member::invited(
            temp_id.clone(),
            invite.household_id.clone(),
            invite.user_id.clone(),
            invite.display_name.clone(),
            invite.role,
            Utc::now(),
        );

        let call = ApiCall::new(
            "members",
            "invite",
            json!({
                "household_id": invite.household_id,
                "user_id": invite.user_id,
                "display_name": invite.display_name,
                "role": invite.role,
            }),
        );
        let plan = MutationPlan::new(ops::MEMBERS_INVITE, call)
            .speculate(speculative.into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Member,
                temp_id: Some(temp_id.into_string()),
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Member>()
    }

    /// Accept or reject a household invitation. The membership state machine
    /// is enforced locally before anything is dispatched.
    pub async fn respond_invitation(
        &self,
        member_id: &MemberId,
        accept: bool,
    ) -> Result<Member, ApiError> {
        let current = self.member_or_reject(ops::MEMBERS_RESPOND, member_id)?;
        let responded = if accept {
            current.accept()
        } else {
            current.reject()
        }
        .map_err(|e| self.reject(ops::MEMBERS_RESPOND, transition_error(e)))?;

        let call = ApiCall::new(
            "members",
            "respond",
            json!({ "id": member_id, "accept": accept }),
        );
        let plan = MutationPlan::new(ops::MEMBERS_RESPOND, call)
            .speculate(responded.into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Member,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Member>()
    }

    pub async fn set_member_role(
        &self,
        member_id: &MemberId,
        role: MemberRole,
    ) -> Result<Member, ApiError> {
        let current = self.member_or_reject(ops::MEMBERS_ROLE, member_id)?;

        let call = ApiCall::new("members", "role", json!({ "id": member_id, "role": role }));
        let plan = MutationPlan::new(ops::MEMBERS_ROLE, call)
            .speculate(current.with_role(role).into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Member,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Member>()
    }

    /// Toggle household visibility for an accepted membership.
    pub async fn set_selected(
        &self,
        member_id: &MemberId,
        selected: bool,
    ) -> Result<Member, ApiError> {
        let current = self.member_or_reject(ops::MEMBERS_SELECT, member_id)?;
        let updated = current
            .set_selected(selected)
            .map_err(|e| self.reject(ops::MEMBERS_SELECT, transition_error(e)))?;

        let call = ApiCall::new(
            "members",
            "select",
            json!({ "id": member_id, "selected": selected }),
        );
        let plan = MutationPlan::new(ops::MEMBERS_SELECT, call)
            .speculate(updated.into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Member,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Member>()
    }

    pub async fn leave_household(&self, member_id: &MemberId) -> Result<Member, ApiError> {
        let current = self.member_or_reject(ops::MEMBERS_LEAVE, member_id)?;
        let left = current
            .leave(Utc::now())
            .map_err(|e| self.reject(ops::MEMBERS_LEAVE, transition_error(e)))?;

        let call = ApiCall::new("members", "leave", json!({ "id": member_id }));
        let plan = MutationPlan::new(ops::MEMBERS_LEAVE, call)
            .speculate(left.into_entity())
            .reconcile(Reconcile::Entity {
                kind: EntityKind::Member,
                temp_id: None,
            });

        let reply = self.mutator().run(plan, None).await?;
        reply.decode::<Member>()
    }

    fn member_or_reject(
        &self,
        op: crate::status::OpKey,
        member_id: &MemberId,
    ) -> Result<Member, ApiError> {
        self.store()
            .read(|s| s.of::<Member>().get(member_id.as_str()).cloned())
            .ok_or_else(|| self.reject(op, ApiError::not_found("member")))
    }
}

fn transition_error(e: TransitionError) -> ApiError {
    ApiError::validation(e.to_string())
}
