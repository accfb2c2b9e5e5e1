use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{HouseholdId, MemberId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Household {
    pub id: HouseholdId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    Member,
}

/// An illegal membership state transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("invitation already resolved")]
    AlreadyResolved,
    #[error("member has not accepted the invitation")]
    NotAccepted,
    #[error("member already left")]
    AlreadyLeft,
}

/// A household member and their invitation lifecycle.
///
/// Lifecycle: `invited` resolves to exactly one of `accepted` or `rejected`
/// (never both). `is_selected` is an orthogonal visibility toggle that is
/// only meaningful while accepted. `left_at` marks a terminal departure from
/// an accepted membership. The transition methods are the only way a valid
/// state changes shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub household_id: HouseholdId,
    pub user_id: UserId,
    pub display_name: String,
    pub role: MemberRole,
    pub is_invited: bool,
    pub is_accepted: bool,
    pub is_rejected: bool,
    pub is_selected: bool,
    pub invited_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_at: Option<DateTime<Utc>>,
}

impl Member {
    /// A freshly invited member: not yet accepted, rejected, or selected.
    pub fn invited(
        id: MemberId,
        household_id: HouseholdId,
        user_id: UserId,
        display_name: impl Into<String>,
        role: MemberRole,
        invited_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            household_id,
            user_id,
            display_name: display_name.into(),
            role,
            is_invited: true,
            is_accepted: false,
            is_rejected: false,
            is_selected: false,
            invited_at,
            left_at: None,
        }
    }

    pub fn accept(mut self) -> Result<Self, TransitionError> {
        if self.is_accepted || self.is_rejected {
            return Err(TransitionError::AlreadyResolved);
        }
        self.is_accepted = true;
        Ok(self)
    }

    pub fn reject(mut self) -> Result<Self, TransitionError> {
        if self.is_accepted || self.is_rejected {
            return Err(TransitionError::AlreadyResolved);
        }
        self.is_rejected = true;
        self.is_selected = false;
        Ok(self)
    }

    pub fn set_selected(mut self, selected: bool) -> Result<Self, TransitionError> {
        if !self.is_accepted {
            return Err(TransitionError::NotAccepted);
        }
        if self.left_at.is_some() {
            return Err(TransitionError::AlreadyLeft);
        }
        self.is_selected = selected;
        Ok(self)
    }

    pub fn with_role(mut self, role: MemberRole) -> Self {
        self.role = role;
        self
    }

    pub fn leave(mut self, at: DateTime<Utc>) -> Result<Self, TransitionError> {
        if !self.is_accepted {
            return Err(TransitionError::NotAccepted);
        }
        if self.left_at.is_some() {
            return Err(TransitionError::AlreadyLeft);
        }
        self.left_at = Some(at);
        self.is_selected = false;
        Ok(self)
    }

    /// Accepted and not departed.
    pub fn is_active(&self) -> bool {
        self.is_accepted && self.left_at.is_none()
    }
}
