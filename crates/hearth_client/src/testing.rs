//! In-memory transports for driving the engine in tests.
//!
//! [`TestRequestTransport`] answers API calls from a closure (immediately,
//! or gated so a test can observe mid-flight state); [`TestEventTransport`]
//! records subscriptions and lets the test push server frames.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::channel::oneshot;
use futures::future::BoxFuture;

use hearth_common::ApiError;
use hearth_sync::{ServerFrame, SubscriptionRequest, UnsubscribeRequest};

use crate::transport::{
    ApiCall, ConnectionState, DispatchResult, EventTransport, FrameListener, RequestTransport,
    StateListener,
};

type Responder = Arc<dyn Fn(ApiCall) -> BoxFuture<'static, DispatchResult> + Send + Sync>;

/// Scriptable request transport; records every call it receives.
pub struct TestRequestTransport {
    responder: Responder,
    calls: Mutex<Vec<ApiCall>>,
}

impl TestRequestTransport {
    pub fn new(responder: Responder) -> Arc<Self> {
        Arc::new(Self {
            responder,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Reply to every call synchronously from `f`.
    pub fn replying<F>(f: F) -> Arc<Self>
    where
        F: Fn(ApiCall) -> DispatchResult + Send + Sync + 'static,
    {
        Self::new(Arc::new(move |call| {
            let result = f(call);
            Box::pin(async move { result })
        }))
    }

    /// A transport whose replies are held until the test releases them, in
    /// FIFO order. Lets tests assert on speculative state while a request is
    /// in flight.
    pub fn gated() -> (Arc<Self>, Gate) {
        let gate = Gate::default();
        let pending = gate.pending.clone();
        let transport = Self::new(Arc::new(move |_call| {
            let (tx, rx) = oneshot::channel();
            pending.lock().unwrap().push_back(tx);
            Box::pin(async move {
                match rx.await {
                    Ok(result) => result,
                    Err(_) => Err(ApiError::network("gate dropped")),
                }
            })
        }));
        (transport, gate)
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl RequestTransport for TestRequestTransport {
    fn call(&self, call: ApiCall) -> BoxFuture<'static, DispatchResult> {
        self.calls.lock().unwrap().push(call.clone());
        (self.responder)(call)
    }
}

/// Controller for a gated [`TestRequestTransport`].
#[derive(Clone, Default)]
pub struct Gate {
    pending: Arc<Mutex<VecDeque<oneshot::Sender<DispatchResult>>>>,
}

impl Gate {
    /// Number of requests currently waiting on the gate. Requests whose
    /// caller has gone away (canceled) are not counted.
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap()
            .iter()
            .filter(|sender| !sender.is_canceled())
            .count()
    }

    /// Release the oldest still-waiting request with `result`. Returns false
    /// if nothing was waiting.
    pub fn release(&self, result: DispatchResult) -> bool {
        let mut pending = self.pending.lock().unwrap();
        while let Some(sender) = pending.pop_front() {
            if sender.is_canceled() {
                continue;
            }
            return sender.send(result).is_ok();
        }
        false
    }
}

/// In-memory push-event transport.
pub struct TestEventTransport {
    frame_listener: Mutex<Option<FrameListener>>,
    state_listener: Mutex<Option<StateListener>>,
    subscriptions: Mutex<Vec<SubscriptionRequest>>,
    unsubscriptions: Mutex<Vec<u64>>,
}

impl TestEventTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            frame_listener: Mutex::new(None),
            state_listener: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
            unsubscriptions: Mutex::new(Vec::new()),
        })
    }

    /// Deliver a frame as if the server pushed it.
    pub fn push(&self, frame: ServerFrame) {
        let listener = self.frame_listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener(frame);
        }
    }

    /// Report a connection state change.
    pub fn set_state(&self, state: ConnectionState) {
        let listener = self.state_listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener(state);
        }
    }

    pub fn subscriptions(&self) -> Vec<SubscriptionRequest> {
        self.subscriptions.lock().unwrap().clone()
    }

    pub fn unsubscriptions(&self) -> Vec<u64> {
        self.unsubscriptions.lock().unwrap().clone()
    }
}

impl EventTransport for TestEventTransport {
    fn subscribe(&self, request: SubscriptionRequest) {
        self.subscriptions.lock().unwrap().push(request);
    }

    fn unsubscribe(&self, request: UnsubscribeRequest) {
        self.unsubscriptions
            .lock()
            .unwrap()
            .push(request.subscription_id);
    }

    fn set_frame_listener(&self, listener: FrameListener) {
        *self.frame_listener.lock().unwrap() = Some(listener);
    }

    fn set_state_listener(&self, listener: StateListener) {
        *self.state_listener.lock().unwrap() = Some(listener);
    }
}
