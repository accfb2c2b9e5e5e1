//! The reactive boundary between the engine and Leptos UI code.
//!
//! [`SyncContext`] wraps a [`HearthClient`] with signals: store and tracker
//! changes bump revision counters, and every exposed view is a derived
//! signal that re-reads the store when its revision moves. UI code depends
//! only on this surface (plus the action methods on the client).

use std::sync::Arc;

use leptos::prelude::*;

use hearth_common::PaginationState;
use hearth_model::{
    Household, HouseholdId, ListKey, Member, Message, MessageId, Poll, PollId, Record, Thread,
    ThreadId, UserId,
};
use hearth_sync::Topic;

use crate::client::HearthClient;
use crate::status::{OpKey, OperationState};
use crate::store::{EntityStore, StoreCollection};
use crate::transport::ConnectionState;

/// Connection control interface exposed to components.
#[derive(Clone)]
pub struct SyncConnection {
    /// Current connection state of the push-event transport.
    pub state: Signal<ConnectionState>,
    /// Open the push-event connection.
    pub open: Arc<dyn Fn() + Send + Sync>,
    /// Close the push-event connection.
    pub close: Arc<dyn Fn() + Send + Sync>,
}

/// Context providing reactive access to the sync engine.
///
/// Provided by `SyncProvider` and consumed by the `use_*` hooks.
#[derive(Clone)]
pub struct SyncContext {
    client: Arc<HearthClient>,
    /// Bumped by the store's change listener after every write.
    store_rev: RwSignal<u64>,
    /// Bumped by the tracker's change listener after every status change.
    ops_rev: RwSignal<u64>,
    current_user: RwSignal<Option<UserId>>,
    ready_state: RwSignal<ConnectionState>,
}

impl SyncContext {
    /// Wire a client's listeners into fresh signals. Typically called by
    /// `SyncProvider`, not user code.
    pub fn new(client: Arc<HearthClient>) -> Self {
        let store_rev = RwSignal::new(0u64);
        let ops_rev = RwSignal::new(0u64);
        let current_user = RwSignal::new(client.current_user());
        let ready_state = RwSignal::new(ConnectionState::Closed);

        client.set_store_listener(Arc::new(move || {
            store_rev.try_update(|rev| *rev += 1);
        }));
        client.tracker().set_listener(Arc::new(move || {
            ops_rev.try_update(|rev| *rev += 1);
        }));
        client.set_session_listener(Arc::new(move |user| {
            current_user.try_update(|current| *current = user);
        }));
        client.events().set_state_listener(Arc::new(move |state| {
            ready_state.try_update(|current| *current = state);
        }));

        // Re-send active subscriptions whenever the connection (re)opens;
        // at-least-once delivery makes duplicates harmless.
        {
            let client = client.clone();
            Effect::new(move |prev: Option<ConnectionState>| {
                let state = ready_state.get();
                if state == ConnectionState::Open && prev != Some(ConnectionState::Open) {
                    client.resubscribe_all();
                }
                state
            });
        }

        Self {
            client,
            store_rev,
            ops_rev,
            current_user,
            ready_state,
        }
    }

    pub fn client(&self) -> Arc<HearthClient> {
        self.client.clone()
    }

    /// Subscribe to a topic for the lifetime of the calling component.
    pub fn use_topic(&self, topic: Topic) {
        self.client.subscribe_topic(topic.clone());
        let client = self.client.clone();
        on_cleanup(move || client.unsubscribe_topic(&topic));
    }

    pub fn connection(&self) -> SyncConnection {
        let open_client = self.client.clone();
        let close_client = self.client.clone();
        SyncConnection {
            state: self.ready_state.into(),
            open: Arc::new(move || open_client.events().open()),
            close: Arc::new(move || close_client.events().close()),
        }
    }

    pub fn ready_state(&self) -> Signal<ConnectionState> {
        self.ready_state.into()
    }

    pub fn current_user(&self) -> Signal<Option<UserId>> {
        self.current_user.into()
    }

    /// One operation class's status and last error.
    pub fn operation(&self, op: OpKey) -> Signal<OperationState> {
        let client = self.client.clone();
        let rev = self.ops_rev;
        Signal::derive(move || {
            rev.get();
            client.tracker().get(op)
        })
    }

    /// Pagination state of one list.
    pub fn pagination<T: Record>(&self, key: ListKey) -> Signal<PaginationState>
    where
        EntityStore: StoreCollection<T>,
    {
        let client = self.client.clone();
        let rev = self.store_rev;
        Signal::derive(move || {
            rev.get();
            client.store().read(|s| s.of::<T>().pagination(&key))
        })
    }

    /// The ordered messages of one thread.
    pub fn messages_in(&self, thread_id: &ThreadId) -> Signal<Vec<Message>> {
        self.list_view::<Message>(ListKey::parent(thread_id))
    }

    /// The ordered threads of one household.
    pub fn threads_in(&self, household_id: &HouseholdId) -> Signal<Vec<Thread>> {
        self.list_view::<Thread>(ListKey::parent(household_id))
    }

    /// The current user's households.
    pub fn households(&self) -> Signal<Vec<Household>> {
        self.list_view::<Household>(ListKey::root())
    }

    /// The members of one household.
    pub fn members_in(&self, household_id: &HouseholdId) -> Signal<Vec<Member>> {
        self.list_view::<Member>(ListKey::parent(household_id))
    }

    pub fn message(&self, id: &MessageId) -> Signal<Option<Message>> {
        self.entity_view::<Message>(id.as_str().to_string())
    }

    pub fn thread(&self, id: &ThreadId) -> Signal<Option<Thread>> {
        self.entity_view::<Thread>(id.as_str().to_string())
    }

    pub fn poll(&self, id: &PollId) -> Signal<Option<Poll>> {
        self.entity_view::<Poll>(id.as_str().to_string())
    }

    /// The poll attached to a message, if any.
    pub fn poll_for_message(&self, message_id: &MessageId) -> Signal<Option<Poll>> {
        let client = self.client.clone();
        let rev = self.store_rev;
        let message_id = message_id.as_str().to_string();
        Signal::derive(move || {
            rev.get();
            client.store().read(|s| {
                s.of::<Message>()
                    .get(&message_id)
                    .and_then(|m| m.poll_id.as_ref())
                    .and_then(|poll_id| s.of::<Poll>().get(poll_id.as_str()).cloned())
            })
        })
    }

    fn list_view<T: Record>(&self, key: ListKey) -> Signal<Vec<T>>
    where
        EntityStore: StoreCollection<T>,
    {
        let client = self.client.clone();
        let rev = self.store_rev;
        Signal::derive(move || {
            rev.get();
            client.store().read(|s| s.of::<T>().list(&key))
        })
    }

    fn entity_view<T: Record>(&self, id: String) -> Signal<Option<T>>
    where
        EntityStore: StoreCollection<T>,
    {
        let client = self.client.clone();
        let rev = self.store_rev;
        Signal::derive(move || {
            rev.get();
            client.store().read(|s| s.of::<T>().get(&id).cloned())
        })
    }
}
