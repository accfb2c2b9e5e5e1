use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::household::TransitionError;
use crate::ids::{HouseholdId, MemberId, ThreadId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Invited,
    Accepted,
    Rejected,
    Left,
}

/// A household member's participation in one thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub member_id: MemberId,
    pub status: ParticipantStatus,
    pub invited_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
}

impl Participant {
    pub fn invited(member_id: MemberId, invited_at: DateTime<Utc>) -> Self {
        Self {
            member_id,
            status: ParticipantStatus::Invited,
            invited_at,
            responded_at: None,
        }
    }

    /// Resolve the invitation. Only a pending invitation can be resolved.
    pub fn respond(mut self, accept: bool, at: DateTime<Utc>) -> Result<Self, TransitionError> {
        if self.status != ParticipantStatus::Invited {
            return Err(TransitionError::AlreadyResolved);
        }
        self.status = if accept {
            ParticipantStatus::Accepted
        } else {
            ParticipantStatus::Rejected
        };
        self.responded_at = Some(at);
        Ok(self)
    }

    pub fn leave(mut self, at: DateTime<Utc>) -> Result<Self, TransitionError> {
        match self.status {
            ParticipantStatus::Accepted => {
                self.status = ParticipantStatus::Left;
                self.responded_at = Some(at);
                Ok(self)
            }
            ParticipantStatus::Left => Err(TransitionError::AlreadyLeft),
            _ => Err(TransitionError::NotAccepted),
        }
    }
}

/// A conversation thread inside a household.
///
/// The thread's message sequence is not nested here: messages live in their
/// own store collection, ordered per thread by the pagination merge engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub household_id: HouseholdId,
    pub author_id: UserId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl Thread {
    pub fn participant(&self, member_id: &MemberId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.member_id == member_id)
    }

    /// Insert or replace a participant by member id.
    pub fn with_participant(mut self, participant: Participant) -> Self {
        if let Some(existing) = self
            .participants
            .iter_mut()
            .find(|p| p.member_id == participant.member_id)
        {
            *existing = participant;
        } else {
            self.participants.push(participant);
        }
        self
    }

    pub fn with_title(mut self, title: impl Into<String>, at: DateTime<Utc>) -> Self {
        self.title = title.into();
        self.updated_at = at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_resolves_once() {
        let p = Participant::invited(MemberId::new("mem-1"), Utc::now());
        let accepted = p.respond(true, Utc::now()).unwrap();
        assert_eq!(accepted.status, ParticipantStatus::Accepted);
        assert!(accepted.responded_at.is_some());
        assert_eq!(
            accepted.respond(false, Utc::now()).unwrap_err(),
            TransitionError::AlreadyResolved
        );
    }

    #[test]
    fn only_accepted_participants_can_leave() {
        let invited = Participant::invited(MemberId::new("mem-1"), Utc::now());
        assert_eq!(
            invited.clone().leave(Utc::now()).unwrap_err(),
            TransitionError::NotAccepted
        );
        let left = invited
            .respond(true, Utc::now())
            .unwrap()
            .leave(Utc::now())
            .unwrap();
        assert_eq!(left.status, ParticipantStatus::Left);
    }

    #[test]
    fn with_participant_replaces_by_member_id() {
        let thread = Thread {
            id: ThreadId::new("th-1"),
            household_id: HouseholdId::new("hh-1"),
            author_id: UserId::new("ana"),
            title: "Groceries".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            participants: vec![Participant::invited(MemberId::new("mem-1"), Utc::now())],
        };
        let updated = thread.clone().with_participant(
            thread.participants[0]
                .clone()
                .respond(true, Utc::now())
                .unwrap(),
        );
        assert_eq!(updated.participants.len(), 1);
        assert_eq!(updated.participants[0].status, ParticipantStatus::Accepted);
    }
}
