//! Poll flows: optimistic vote counts, conflict rollback, poll creation
//! linkage.

mod common;

use common::*;

use hearth_client::actions::{PollDraft, PollOptionDraft, ops};
use hearth_client::{ApiError, ErrorKind};
use hearth_model::{
    MessageId, OptionId, Poll, PollId, PollKind, PollStatus, Record, UserId,
};
use hearth_sync::{EventBatch, PushEvent, ServerFrame};

fn push_poll(events: &hearth_client::testing::TestEventTransport, poll: &Poll) {
    events.push(ServerFrame::Events(EventBatch {
        events: vec![PushEvent::Created(poll.clone().into_entity())],
    }));
}

#[tokio::test]
async fn conflicting_vote_restores_the_count() {
    let (client, _transport, gate, events) = gated_client();
    welcome(&events, "ana");
    push_poll(&events, &poll_with_vote("poll-1", "msg-1", "ben"));

    let option = OptionId::new("opt-a");
    let count_before = client.store().read(|s| {
        s.of::<Poll>().get("poll-1").unwrap().option(&option).unwrap().vote_count()
    });
    assert_eq!(count_before, 1);

    let worker = client.clone();
    let handle = tokio::spawn(async move {
        worker.vote(&PollId::new("poll-1"), &OptionId::new("opt-a"), None).await
    });
    wait_for_pending(&gate).await;

    // Speculative: the vote is counted immediately.
    client.store().read(|s| {
        let poll = s.of::<Poll>().get("poll-1").unwrap();
        assert_eq!(poll.option(&option).unwrap().vote_count(), 2);
    });

    assert!(gate.release(Err(ApiError::conflict("already voted"))));
    let err = handle.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Rollback: the count equals its pre-vote value.
    client.store().read(|s| {
        let poll = s.of::<Poll>().get("poll-1").unwrap();
        assert_eq!(poll.option(&option).unwrap().vote_count(), count_before);
        assert!(!poll.option(&option).unwrap().has_vote_from(&UserId::new("ana")));
    });
    let state = client.tracker().get(ops::POLLS_VOTE);
    assert!(state.is_failed());
    assert_eq!(state.error.as_deref(), Some("conflict: already voted"));
}

#[tokio::test]
async fn locally_illegal_votes_never_reach_the_transport() {
    let (client, transport, _gate, events) = gated_client();
    welcome(&events, "ana");

    let closed = poll_with_vote("poll-1", "msg-1", "ben").closed();
    push_poll(&events, &closed);

    let err = client
        .vote(&PollId::new("poll-1"), &OptionId::new("opt-a"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(transport.call_count(), 0);
    assert!(client.tracker().get(ops::POLLS_VOTE).is_failed());
}

#[tokio::test]
async fn double_vote_is_rejected_as_conflict_before_dispatch() {
    let (client, transport, _gate, events) = gated_client();
    // ana already voted opt-a (single-choice would move the vote, so use a
    // multiple-choice poll to hit the duplicate check).
    let mut poll = poll_with_vote("poll-1", "msg-1", "ana");
    poll.kind = PollKind::MultipleChoice;
    welcome(&events, "ana");
    push_poll(&events, &poll);

    let err = client
        .vote(&PollId::new("poll-1"), &OptionId::new("opt-a"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn created_poll_is_relinked_to_the_server_id() {
    let (client, _transport, gate, events) = gated_client();
    welcome(&events, "ana");
    events.push(ServerFrame::Events(EventBatch {
        events: vec![PushEvent::Created(
            message("msg-1", "th-1", "what about pizza?").into_entity(),
        )],
    }));

    let draft = PollDraft {
        message_id: MessageId::new("msg-1"),
        question: "Which day?".into(),
        kind: PollKind::SingleChoice,
        ends_at: None,
        options: vec![
            PollOptionDraft { text: "Friday".into(), event_date: None },
            PollOptionDraft { text: "Saturday".into(), event_date: None },
        ],
    };

    let worker = client.clone();
    let handle = tokio::spawn(async move { worker.create_poll(draft, None).await });
    wait_for_pending(&gate).await;

    // Mid-flight: the message references the temporary poll id.
    client.store().read(|s| {
        let message = s.of::<hearth_model::Message>().get("msg-1").unwrap();
        assert!(message.poll_id.as_ref().unwrap().is_temp());
    });

    let authoritative = Poll {
        id: PollId::new("poll-77"),
        message_id: MessageId::new("msg-1"),
        question: "Which day?".into(),
        kind: PollKind::SingleChoice,
        status: PollStatus::Open,
        ends_at: None,
        options: vec![],
    };
    assert!(gate.release(entity_reply(&authoritative)));

    let created = handle.await.unwrap().unwrap();
    assert_eq!(created.id.as_str(), "poll-77");

    client.store().read(|s| {
        assert!(s.of::<Poll>().contains("poll-77"));
        assert_eq!(s.of::<Poll>().len(), 1, "temporary poll is gone");
        let message = s.of::<hearth_model::Message>().get("msg-1").unwrap();
        assert_eq!(message.poll_id.as_ref().unwrap().as_str(), "poll-77");
    });
}

#[tokio::test]
async fn retract_removes_only_my_votes_and_rolls_back_on_failure() {
    let (client, _transport, gate, events) = gated_client();
    welcome(&events, "ana");

    let mut poll = poll_with_vote("poll-1", "msg-1", "ben");
    poll.kind = PollKind::MultipleChoice;
    let poll = poll
        .with_vote(
            &OptionId::new("opt-b"),
            hearth_model::PollVote {
                id: hearth_model::VoteId::new("v-2"),
                user_id: UserId::new("ana"),
                rank: None,
            },
        )
        .unwrap();
    push_poll(&events, &poll);

    let worker = client.clone();
    let handle = tokio::spawn(async move { worker.retract_vote(&PollId::new("poll-1")).await });
    wait_for_pending(&gate).await;

    client.store().read(|s| {
        let poll = s.of::<Poll>().get("poll-1").unwrap();
        assert_eq!(poll.total_votes(), 1, "only ben's vote remains");
    });

    assert!(gate.release(Err(ApiError::server("boom"))));
    assert!(handle.await.unwrap().is_err());

    client.store().read(|s| {
        let poll = s.of::<Poll>().get("poll-1").unwrap();
        assert_eq!(poll.total_votes(), 2, "retraction rolled back");
    });
}
