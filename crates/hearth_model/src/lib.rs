//! hearth_model
//!
//! Normalized domain entities for the household-coordination app: threads,
//! messages (attachments, reactions, mentions, read receipts), polls,
//! households, and members.
//!
//! Entities are immutable value records: the store always holds the current
//! version and every write replaces the whole value. The `with_*` helpers
//! produce updated copies for speculative (optimistic) writes; they never
//! mutate in place.
//!
//! The [`Entity`] / [`EntityKind`] closed sums make event dispatch and store
//! writes exhaustive and statically checkable; [`Record`] is the per-type
//! seam the generic store is written against.

mod entity;
mod household;
mod ids;
mod message;
mod poll;
mod thread;

pub use entity::{Entity, EntityKind, EntityRef, ListKey, Record};
pub use household::{Household, Member, MemberRole, TransitionError};
pub use ids::{
    AttachmentId, HouseholdId, MemberId, MentionId, MessageId, OptionId, PollId, ReactionId,
    ThreadId, UserId, VoteId, TEMP_ID_PREFIX,
};
pub use message::{Attachment, Mention, Message, Reaction, ReactionKind, ReadReceipts};
pub use poll::{Poll, PollKind, PollOption, PollStatus, PollVote, VoteError};
pub use thread::{Participant, ParticipantStatus, Thread};
