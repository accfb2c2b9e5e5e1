//! Shared fixtures for the integration tests: entity builders and a client
//! wired to the in-memory transports.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use hearth_client::testing::{Gate, TestEventTransport, TestRequestTransport};
use hearth_client::{ApiReply, DispatchResult, HearthClient, PageMeta};
use hearth_model::{
    Household, HouseholdId, Member, MemberId, MemberRole, Message, MessageId, OptionId, Poll,
    PollId, PollKind, PollOption, PollStatus, PollVote, ReadReceipts, Thread, ThreadId, UserId,
    VoteId,
};
use hearth_sync::{ServerFrame, Welcome};

pub fn message(id: &str, thread: &str, content: &str) -> Message {
    Message {
        id: MessageId::new(id),
        thread_id: ThreadId::new(thread),
        author_id: UserId::new("ana"),
        content: content.into(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        deleted_at: None,
        attachments: vec![],
        reactions: vec![],
        mentions: vec![],
        poll_id: None,
        receipts: ReadReceipts::default(),
    }
}

pub fn thread(id: &str, household: &str, title: &str) -> Thread {
    Thread {
        id: ThreadId::new(id),
        household_id: HouseholdId::new(household),
        author_id: UserId::new("ana"),
        title: title.into(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        participants: vec![],
    }
}

pub fn household(id: &str, name: &str) -> Household {
    Household {
        id: HouseholdId::new(id),
        name: name.into(),
        created_at: Utc::now(),
    }
}

pub fn member(id: &str, household: &str, user: &str) -> Member {
    Member::invited(
        MemberId::new(id),
        HouseholdId::new(household),
        UserId::new(user),
        user,
        MemberRole::Member,
        Utc::now(),
    )
}

pub fn poll_with_vote(id: &str, message: &str, voter: &str) -> Poll {
    Poll {
        id: PollId::new(id),
        message_id: MessageId::new(message),
        question: "Pizza night?".into(),
        kind: PollKind::SingleChoice,
        status: PollStatus::Open,
        ends_at: None,
        options: vec![
            PollOption {
                id: OptionId::new("opt-a"),
                text: "Friday".into(),
                event_date: None,
                votes: vec![PollVote {
                    id: VoteId::new("v-1"),
                    user_id: UserId::new(voter),
                    rank: None,
                }],
            },
            PollOption {
                id: OptionId::new("opt-b"),
                text: "Saturday".into(),
                event_date: None,
                votes: vec![],
            },
        ],
    }
}

/// A client over a gated request transport.
pub fn gated_client() -> (Arc<HearthClient>, Arc<TestRequestTransport>, Gate, Arc<TestEventTransport>) {
    let (transport, gate) = TestRequestTransport::gated();
    let events = TestEventTransport::new();
    let client = HearthClient::new(transport.clone(), events.clone());
    (client, transport, gate, events)
}

/// A client whose transport replies synchronously from `f`.
pub fn replying_client<F>(
    f: F,
) -> (Arc<HearthClient>, Arc<TestRequestTransport>, Arc<TestEventTransport>)
where
    F: Fn(hearth_client::ApiCall) -> DispatchResult + Send + Sync + 'static,
{
    let transport = TestRequestTransport::replying(f);
    let events = TestEventTransport::new();
    let client = HearthClient::new(transport.clone(), events.clone());
    (client, transport, events)
}

/// Authenticate the client via a server welcome frame.
pub fn welcome(events: &TestEventTransport, user: &str) {
    events.push(ServerFrame::Welcome(Welcome {
        user_id: UserId::new(user),
    }));
}

/// Reply payload for a list call.
pub fn list_reply<T: serde::Serialize>(items: &[T], meta: PageMeta) -> DispatchResult {
    Ok(ApiReply::new(json!(items)).with_page(meta))
}

/// Reply payload for a single-entity call.
pub fn entity_reply<T: serde::Serialize>(entity: &T) -> DispatchResult {
    Ok(ApiReply::new(json!(entity)))
}

/// Await `fut` while releasing the next gated request with `result`.
pub async fn drive<T>(fut: impl Future<Output = T>, gate: &Gate, result: DispatchResult) -> T {
    let (value, _) = tokio::join!(fut, async {
        while gate.pending() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(gate.release(result));
    });
    value
}

/// Yield until the gate holds a pending request.
pub async fn wait_for_pending(gate: &Gate) {
    while gate.pending() == 0 {
        tokio::task::yield_now().await;
    }
}

/// Let every spawned task run up to its next await point.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
