//! Dispatchable action functions, one per mutation the UI can trigger.
//!
//! Each mutation builds a [`crate::mutation::MutationPlan`] (the operation
//! key it reports under, a synthesized speculative entity, and the request)
//! and runs it through the one optimistic protocol. Actions return the
//! authoritative result so callers can chain follow-on side effects (e.g.
//! uploading a file after the message exists).

mod members;
mod messages;
mod polls;
mod session;
mod threads;

pub use members::MemberInvite;
pub use messages::MessageDraft;
pub use polls::{PollDraft, PollOptionDraft};
pub use session::{Credentials, SessionInfo};
pub use threads::ThreadDraft;

/// Well-known operation keys, namespaced `<slice>.<action>`.
pub mod ops {
    use crate::status::OpKey;

    pub const MESSAGES_LIST: OpKey = OpKey::new("messages", "list");
    pub const MESSAGES_CREATE: OpKey = OpKey::new("messages", "create");
    pub const MESSAGES_UPDATE: OpKey = OpKey::new("messages", "update");
    pub const MESSAGES_DELETE: OpKey = OpKey::new("messages", "delete");
    pub const MESSAGES_REACT: OpKey = OpKey::new("messages", "react");
    pub const MESSAGES_UNREACT: OpKey = OpKey::new("messages", "unreact");
    pub const MESSAGES_MARK_READ: OpKey = OpKey::new("messages", "mark_read");

    pub const THREADS_LIST: OpKey = OpKey::new("threads", "list");
    pub const THREADS_CREATE: OpKey = OpKey::new("threads", "create");
    pub const THREADS_RENAME: OpKey = OpKey::new("threads", "rename");
    pub const THREADS_DELETE: OpKey = OpKey::new("threads", "delete");
    pub const THREADS_ADD_PARTICIPANT: OpKey = OpKey::new("threads", "add_participant");
    pub const THREADS_RESPOND: OpKey = OpKey::new("threads", "respond");

    pub const POLLS_CREATE: OpKey = OpKey::new("polls", "create");
    pub const POLLS_VOTE: OpKey = OpKey::new("polls", "vote");
    pub const POLLS_RETRACT: OpKey = OpKey::new("polls", "retract");
    pub const POLLS_CLOSE: OpKey = OpKey::new("polls", "close");

    pub const HOUSEHOLDS_LIST: OpKey = OpKey::new("households", "list");

    pub const MEMBERS_LIST: OpKey = OpKey::new("members", "list");
    pub const MEMBERS_INVITE: OpKey = OpKey::new("members", "invite");
    pub const MEMBERS_RESPOND: OpKey = OpKey::new("members", "respond");
    pub const MEMBERS_ROLE: OpKey = OpKey::new("members", "role");
    pub const MEMBERS_SELECT: OpKey = OpKey::new("members", "select");
    pub const MEMBERS_LEAVE: OpKey = OpKey::new("members", "leave");

    pub const SESSION_LOGIN: OpKey = OpKey::new("session", "login");
    pub const SESSION_INITIALIZE: OpKey = OpKey::new("session", "initialize");
}
