use serde::{Deserialize, Serialize};

use hearth_model::{Entity, EntityKind, EntityRef, UserId};

/// Subscription scope: an entire collection (`id: None`) or one entity.
///
/// Scoping by a parent entity is expressed as a topic on the parent: a
/// client watching a thread's messages subscribes to the thread's topic and
/// receives message events for that thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    pub kind: EntityKind,
    pub id: Option<String>,
}

impl Topic {
    pub fn collection(kind: EntityKind) -> Self {
        Self { kind, id: None }
    }

    pub fn entity(kind: EntityKind, id: impl Into<String>) -> Self {
        Self { kind, id: Some(id.into()) }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}/{}", self.kind, id),
            None => write!(f, "{}/*", self.kind),
        }
    }
}

/// Subscribe to a topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    /// Logical client-side identifier for this subscription.
    pub subscription_id: u64,
    pub topic: Topic,
}

/// Cancel an existing subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribeRequest {
    pub subscription_id: u64,
}

/// Client -> server frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientFrame {
    Subscribe(SubscriptionRequest),
    Unsubscribe(UnsubscribeRequest),
}

/// Sent once per connection, before any events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Welcome {
    /// The authenticated user behind this connection.
    pub user_id: UserId,
}

/// A single entity change pushed by the server.
///
/// Delivery is at-least-once and order is not guaranteed; the reconciliation
/// layer applies events through the store's last-write-wins primitive, which
/// makes re-delivery idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PushEvent {
    Created(Entity),
    Updated(Entity),
    Deleted(EntityRef),
}

/// Discriminant-only view of [`PushEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Created,
    Updated,
    Deleted,
}

impl PushEvent {
    pub fn action(&self) -> EventAction {
        match self {
            PushEvent::Created(_) => EventAction::Created,
            PushEvent::Updated(_) => EventAction::Updated,
            PushEvent::Deleted(_) => EventAction::Deleted,
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        match self {
            PushEvent::Created(e) | PushEvent::Updated(e) => e.entity_ref(),
            PushEvent::Deleted(r) => r.clone(),
        }
    }
}

/// One batch of push events. The server may coalesce several changes into a
/// single frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBatch {
    pub events: Vec<PushEvent>,
}

/// Server -> client frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerFrame {
    Welcome(Welcome),
    Events(EventBatch),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hearth_model::{Household, HouseholdId, Record};

    #[test]
    fn event_reports_action_and_ref() {
        let household = Household {
            id: HouseholdId::new("hh-1"),
            name: "Maple St".into(),
            created_at: Utc::now(),
        };
        let event = PushEvent::Created(household.into_entity());
        assert_eq!(event.action(), EventAction::Created);
        assert_eq!(event.entity_ref(), EntityRef::new(EntityKind::Household, "hh-1"));

        let delete = PushEvent::Deleted(EntityRef::new(EntityKind::Message, "msg-1"));
        assert_eq!(delete.action(), EventAction::Deleted);
    }

    #[test]
    fn server_frame_survives_the_wire_codec() {
        let frame = ServerFrame::Events(EventBatch {
            events: vec![PushEvent::Deleted(EntityRef::new(EntityKind::Thread, "th-9"))],
        });
        let wire = hearth_common::codec::encode_frame(&frame).unwrap();
        let decoded: Vec<ServerFrame> = hearth_common::codec::decode_batch(&wire);
        assert_eq!(decoded.len(), 1);
        match &decoded[0] {
            ServerFrame::Events(batch) => {
                assert_eq!(batch.events[0].entity_ref().id, "th-9");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn topic_display_distinguishes_scopes() {
        assert_eq!(Topic::collection(EntityKind::Thread).to_string(), "threads/*");
        assert_eq!(
            Topic::entity(EntityKind::Thread, "th-1").to_string(),
            "threads/th-1"
        );
    }
}
