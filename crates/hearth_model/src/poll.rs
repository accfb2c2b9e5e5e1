use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{MessageId, OptionId, PollId, UserId, VoteId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollKind {
    SingleChoice,
    MultipleChoice,
    Ranked,
    /// Options are candidate dates for a household event.
    EventDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoteError {
    #[error("poll is closed")]
    Closed,
    #[error("unknown poll option")]
    UnknownOption,
    #[error("already voted for this option")]
    AlreadyVoted,
    #[error("ranked polls require a rank")]
    MissingRank,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollVote {
    pub id: VoteId,
    pub user_id: UserId,
    /// Position for ranked polls; `None` for the other kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: OptionId,
    pub text: String,
    /// The candidate date for [`PollKind::EventDate`] polls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub votes: Vec<PollVote>,
}

impl PollOption {
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    pub fn has_vote_from(&self, user: &UserId) -> bool {
        self.votes.iter().any(|v| &v.user_id == user)
    }
}

/// A poll attached to a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    pub message_id: MessageId,
    pub question: String,
    pub kind: PollKind,
    pub status: PollStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    pub options: Vec<PollOption>,
}

impl Poll {
    pub fn is_open(&self) -> bool {
        self.status == PollStatus::Open
    }

    pub fn option(&self, id: &OptionId) -> Option<&PollOption> {
        self.options.iter().find(|o| &o.id == id)
    }

    pub fn total_votes(&self) -> usize {
        self.options.iter().map(PollOption::vote_count).sum()
    }

    /// Record a vote, enforcing the poll kind's semantics:
    ///
    /// - single-choice: the user's previous vote (on any option) is replaced;
    /// - multiple-choice / event-date: one vote per option per user;
    /// - ranked: requires a rank; re-voting an option replaces the rank.
    pub fn with_vote(mut self, option_id: &OptionId, vote: PollVote) -> Result<Self, VoteError> {
        if !self.is_open() {
            return Err(VoteError::Closed);
        }
        let Some(idx) = self.options.iter().position(|o| &o.id == option_id) else {
            return Err(VoteError::UnknownOption);
        };

        match self.kind {
            PollKind::SingleChoice => {
                for option in &mut self.options {
                    option.votes.retain(|v| v.user_id != vote.user_id);
                }
            }
            PollKind::MultipleChoice | PollKind::EventDate => {
                if self.options[idx].has_vote_from(&vote.user_id) {
                    return Err(VoteError::AlreadyVoted);
                }
            }
            PollKind::Ranked => {
                if vote.rank.is_none() {
                    return Err(VoteError::MissingRank);
                }
                self.options[idx].votes.retain(|v| v.user_id != vote.user_id);
            }
        }

        self.options[idx].votes.push(vote);
        Ok(self)
    }

    /// Retract every vote the user has cast on this poll.
    pub fn without_votes_from(mut self, user: &UserId) -> Self {
        for option in &mut self.options {
            option.votes.retain(|v| &v.user_id != user);
        }
        self
    }

    pub fn closed(mut self) -> Self {
        self.status = PollStatus::Closed;
        self
    }
}
