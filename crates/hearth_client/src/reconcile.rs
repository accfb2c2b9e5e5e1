//! Real-time reconciliation.
//!
//! Push events go through the exact store primitives the mutation engine
//! uses (`upsert` for created/updated, `remove` for deleted), so there is
//! one merge path and re-delivered events are idempotent. Ordering is not
//! guaranteed by the transport; last-write-wins resolution makes that safe.

use hearth_sync::{EventBatch, PushEvent};

use crate::store::SharedStore;

/// Apply one push event to the store.
pub fn apply_event(store: &SharedStore, event: PushEvent) {
    log::debug!("[reconcile] {:?} {}", event.action(), event.entity_ref());
    match event {
        PushEvent::Created(entity) | PushEvent::Updated(entity) => {
            store.write(|s| s.upsert(entity));
        }
        PushEvent::Deleted(target) => {
            store.write(|s| {
                s.remove(&target);
            });
        }
    }
}

/// Apply a batch of push events in delivery order.
pub fn apply_batch(store: &SharedStore, batch: EventBatch) {
    for event in batch.events {
        apply_event(store, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hearth_model::{
        Entity, EntityKind, EntityRef, Household, HouseholdId, Message, MessageId, ReadReceipts,
        Record, ThreadId, UserId,
    };

    fn message(id: &str, content: &str) -> Message {
        Message {
            id: MessageId::new(id),
            thread_id: ThreadId::new("th-1"),
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

    #[test]
    fn created_and_updated_share_the_upsert_path() {
        let store = SharedStore::new();
        apply_event(&store, PushEvent::Created(message("m1", "hi").into_entity()));
        apply_event(
            &store,
            PushEvent::Updated(message("m1", "hi, edited").into_entity()),
        );

        store.read(|s| {
            assert_eq!(s.of::<Message>().len(), 1);
            assert_eq!(s.of::<Message>().get("m1").unwrap().content, "hi, edited");
        });
    }

    #[test]
    fn redelivered_events_are_idempotent() {
        let store = SharedStore::new();
        let event = PushEvent::Created(message("m1", "hi").into_entity());
        apply_event(&store, event.clone());
        let once = store.read(|s| s.clone());

        apply_event(&store, event);
        let twice = store.read(|s| s.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn deleted_removes_the_entity() {
        let store = SharedStore::new();
        apply_event(&store, PushEvent::Created(message("m1", "hi").into_entity()));
        apply_event(
            &store,
            PushEvent::Deleted(EntityRef::new(EntityKind::Message, "m1")),
        );
        store.read(|s| assert!(!s.of::<Message>().contains("m1")));

        // Deleting an entity we never saw is a no-op, not an error.
        apply_event(
            &store,
            PushEvent::Deleted(EntityRef::new(EntityKind::Message, "m404")),
        );
    }

    #[test]
    fn batches_apply_in_delivery_order() {
        let store = SharedStore::new();
        let batch = EventBatch {
            events: vec![
                PushEvent::Created(
                    Entity::Household(Household {
                        id: HouseholdId::new("hh-1"),
                        name: "Maple St".into(),
                        created_at: Utc::now(),
                    }),
                ),
                PushEvent::Created(message("m1", "first").into_entity()),
                PushEvent::Updated(message("m1", "second").into_entity()),
            ],
        };
        apply_batch(&store, batch);

        store.read(|s| {
            assert!(s.of::<Household>().contains("hh-1"));
            assert_eq!(s.of::<Message>().get("m1").unwrap().content, "second");
        });
    }
}
