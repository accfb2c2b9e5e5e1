//! The non-reactive client façade.
//!
//! [`HearthClient`] owns the engine pieces (store, tracker, deduplicator,
//! mutator, transports) and the subscription bookkeeping. The Leptos layer
//! (`SyncContext`) wraps it with signals; tests drive it directly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use hearth_common::{ApiError, PageMeta, PageQuery};
use hearth_model::{ListKey, Record, UserId};
use hearth_sync::{ServerFrame, SubscriptionRequest, Topic, UnsubscribeRequest};

use crate::dedupe::RequestDeduplicator;
use crate::mutation::Mutator;
use crate::reconcile;
use crate::status::{OpKey, OperationTracker};
use crate::store::{ChangeListener, EntityStore, SharedStore, StoreCollection};
use crate::transport::{ApiCall, DispatchResult, EventTransport, RequestTransport};

/// Ref-counted subscription entry: first subscriber sends the subscribe
/// frame, the last one to leave sends the unsubscribe.
struct SubscriptionEntry {
    subscription_id: u64,
    ref_count: usize,
}

type SessionListener = Arc<dyn Fn(Option<UserId>) + Send + Sync>;

pub struct HearthClient {
    store: SharedStore,
    tracker: OperationTracker,
    dedupe: RequestDeduplicator,
    transport: Arc<dyn RequestTransport>,
    events: Arc<dyn EventTransport>,
    mutator: Mutator,
    current_user: Mutex<Option<UserId>>,
    session_listener: Mutex<Option<SessionListener>>,
    next_temp_id: Mutex<u64>,
    subscriptions: Mutex<HashMap<Topic, SubscriptionEntry>>,
    next_subscription_id: Mutex<u64>,
}

impl HearthClient {
    /// Build a client over the two collaborator transports and wire incoming
    /// frames into the reconciliation layer.
    pub fn new(
        transport: Arc<dyn RequestTransport>,
        events: Arc<dyn EventTransport>,
    ) -> Arc<Self> {
        let store = SharedStore::new();
        let tracker = OperationTracker::new();
        let dedupe = RequestDeduplicator::new();
        let mutator = Mutator::new(
            store.clone(),
            tracker.clone(),
            dedupe.clone(),
            transport.clone(),
        );

        let client = Arc::new(Self {
            store,
            tracker,
            dedupe,
            transport,
            events,
            mutator,
            current_user: Mutex::new(None),
            session_listener: Mutex::new(None),
            next_temp_id: Mutex::new(0),
            subscriptions: Mutex::new(HashMap::new()),
            next_subscription_id: Mutex::new(0),
        });

        // Weak: the transport holds the listener, the client holds the
        // transport.
        let weak: Weak<HearthClient> = Arc::downgrade(&client);
        client.events.set_frame_listener(Arc::new(move |frame| {
            if let Some(client) = weak.upgrade() {
                client.handle_frame(frame);
            }
        }));

        client
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn tracker(&self) -> &OperationTracker {
        &self.tracker
    }

    pub fn dedupe(&self) -> &RequestDeduplicator {
        &self.dedupe
    }

    pub fn events(&self) -> &Arc<dyn EventTransport> {
        &self.events
    }

    pub(crate) fn mutator(&self) -> &Mutator {
        &self.mutator
    }

    pub(crate) fn transport(&self) -> &Arc<dyn RequestTransport> {
        &self.transport
    }

    /// Route one server frame. Welcome fixes the session identity; events go
    /// through the reconciliation layer.
    pub fn handle_frame(&self, frame: ServerFrame) {
        match frame {
            ServerFrame::Welcome(welcome) => {
                log::debug!("[client] welcome as {}", welcome.user_id);
                self.set_current_user(Some(welcome.user_id));
            }
            ServerFrame::Events(batch) => reconcile::apply_batch(&self.store, batch),
        }
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.current_user.lock().unwrap().clone()
    }

    pub(crate) fn set_current_user(&self, user: Option<UserId>) {
        *self.current_user.lock().unwrap() = user.clone();
        let listener = self.session_listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener(user);
        }
    }

    /// Observe session identity changes (used by the reactive layer).
    pub fn set_session_listener(&self, listener: SessionListener) {
        *self.session_listener.lock().unwrap() = Some(listener);
    }

    /// The authenticated user, or `Unauthorized` for actions that need one.
    pub fn require_user(&self) -> Result<UserId, ApiError> {
        self.current_user().ok_or(ApiError::Unauthorized)
    }

    /// Next client-local temporary id suffix.
    pub(crate) fn next_temp(&self) -> u64 {
        let mut next = self.next_temp_id.lock().unwrap();
        *next += 1;
        *next
    }

    // ------------------------------------------------------------------
    // Topic subscriptions
    // ------------------------------------------------------------------

    /// Subscribe to a topic. Shared across callers: only the first
    /// subscription for a topic reaches the transport.
    pub fn subscribe_topic(&self, topic: Topic) {
        let request = {
            let mut subs = self.subscriptions.lock().unwrap();
            if let Some(entry) = subs.get_mut(&topic) {
                entry.ref_count += 1;
                None
            } else {
                let subscription_id = {
                    let mut next = self.next_subscription_id.lock().unwrap();
                    let id = *next;
                    *next += 1;
                    id
                };
                subs.insert(
                    topic.clone(),
                    SubscriptionEntry {
                        subscription_id,
                        ref_count: 1,
                    },
                );
                Some(SubscriptionRequest {
                    subscription_id,
                    topic,
                })
            }
        };
        if let Some(request) = request {
            log::debug!("[client] subscribe {}", request.topic);
            self.events.subscribe(request);
        }
    }

    /// Drop one reference to a topic; the last drop unsubscribes.
    pub fn unsubscribe_topic(&self, topic: &Topic) {
        let released = {
            let mut subs = self.subscriptions.lock().unwrap();
            match subs.get_mut(topic) {
                Some(entry) => {
                    entry.ref_count -= 1;
                    if entry.ref_count == 0 {
                        let id = entry.subscription_id;
                        subs.remove(topic);
                        Some(id)
                    } else {
                        None
                    }
                }
                None => None,
            }
        };
        if let Some(subscription_id) = released {
            log::debug!("[client] unsubscribe {topic}");
            self.events.unsubscribe(UnsubscribeRequest { subscription_id });
        }
    }

    /// Re-send every active subscription. Called when the event transport
    /// (re)opens; delivery is at-least-once, so duplicates are harmless.
    pub fn resubscribe_all(&self) {
        let requests: Vec<SubscriptionRequest> = {
            let subs = self.subscriptions.lock().unwrap();
            subs.iter()
                .map(|(topic, entry)| SubscriptionRequest {
                    subscription_id: entry.subscription_id,
                    topic: topic.clone(),
                })
                .collect()
        };
        for request in requests {
            self.events.subscribe(request);
        }
    }

    // ------------------------------------------------------------------
    // Read-path helpers shared by the fetch actions
    // ------------------------------------------------------------------

    /// Fetch one page of a list and merge it into the store.
    pub(crate) async fn fetch_page<T: Record>(
        &self,
        op: OpKey,
        call: ApiCall,
        key: &ListKey,
        query: PageQuery,
    ) -> Result<Vec<T>, ApiError>
    where
        EntityStore: StoreCollection<T>,
    {
        self.tracker.begin(op);
        let initial = query.is_initial();
        let result = self.call_with_retry(call.with_page(query)).await;

        let outcome = match result {
            Ok(reply) => reply.decode::<Vec<T>>().map(|items| {
                let meta = reply.page.clone().unwrap_or_else(PageMeta::done);
                self.store.write(|store| {
                    store.merge_page(key, items.clone(), &meta, initial);
                });
                items
            }),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(items) => {
                self.tracker.succeed(op);
                Ok(items)
            }
            Err(err) => {
                self.tracker.fail(op, err.to_string());
                Err(err)
            }
        }
    }

    /// Idempotent reads retry once on a network interruption; mutations
    /// never auto-retry.
    pub(crate) async fn call_with_retry(&self, call: ApiCall) -> DispatchResult {
        match self.transport.call(call.clone()).await {
            Err(ApiError::Network { message }) => {
                log::debug!("[client] retrying {} after network error: {message}", call.op_key());
                self.transport.call(call).await
            }
            other => other,
        }
    }

    /// Record a client-side rejection (an illegal state transition, a vote on
    /// a closed poll) in the tracker and hand the error back.
    pub(crate) fn reject(&self, op: OpKey, err: ApiError) -> ApiError {
        self.tracker.begin(op);
        self.tracker.fail(op, err.to_string());
        err
    }

    /// Install the store change listener (used by the reactive layer).
    pub fn set_store_listener(&self, listener: ChangeListener) {
        self.store.set_listener(listener);
    }
}
