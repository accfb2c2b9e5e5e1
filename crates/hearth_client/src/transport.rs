//! Collaborator seams: the request/response transport, the push-event
//! transport, and caller-supplied cancellation.
//!
//! Transport mechanics (HTTP, auth headers, WebSocket reconnect policy) live
//! behind these traits; the engine only sees typed calls, typed frames, and
//! the closed [`ApiError`] taxonomy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{AbortHandle, Abortable, BoxFuture};
use serde::de::DeserializeOwned;

use hearth_common::{ApiError, PageMeta, PageQuery};
use hearth_model::{Entity, EntityKind};
use hearth_sync::{ServerFrame, SubscriptionRequest, UnsubscribeRequest};

use crate::status::OpKey;

/// Settled outcome of one dispatched request.
pub type DispatchResult = Result<ApiReply, ApiError>;

/// One request/response exchange: a resource slice, an action on it, and a
/// JSON parameter payload.
#[derive(Debug, Clone)]
pub struct ApiCall {
    pub resource: &'static str,
    pub action: &'static str,
    pub params: serde_json::Value,
    pub page: Option<PageQuery>,
}

impl ApiCall {
    pub fn new(resource: &'static str, action: &'static str, params: serde_json::Value) -> Self {
        Self {
            resource,
            action,
            params,
            page: None,
        }
    }

    pub fn with_page(mut self, page: PageQuery) -> Self {
        self.page = Some(page);
        self
    }

    /// The operation key this call reports under.
    pub fn op_key(&self) -> OpKey {
        OpKey::new(self.resource, self.action)
    }
}

/// A successful reply: the JSON payload plus pagination metadata for list
/// calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub data: serde_json::Value,
    pub page: Option<PageMeta>,
}

impl ApiReply {
    pub fn new(data: serde_json::Value) -> Self {
        Self { data, page: None }
    }

    pub fn with_page(mut self, page: PageMeta) -> Self {
        self.page = Some(page);
        self
    }

    /// Decode the payload. A reply the client cannot understand is reported
    /// as a server error; the request itself succeeded.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| ApiError::server(format!("malformed reply: {e}")))
    }

    /// Decode the payload as one entity of the given kind.
    pub fn decode_entity(&self, kind: EntityKind) -> Result<Entity, ApiError> {
        Ok(match kind {
            EntityKind::Thread => Entity::Thread(self.decode()?),
            EntityKind::Message => Entity::Message(self.decode()?),
            EntityKind::Poll => Entity::Poll(self.decode()?),
            EntityKind::Household => Entity::Household(self.decode()?),
            EntityKind::Member => Entity::Member(self.decode()?),
        })
    }
}

/// The request/response collaborator.
pub trait RequestTransport: Send + Sync + 'static {
    fn call(&self, call: ApiCall) -> BoxFuture<'static, DispatchResult>;
}

/// Connection lifecycle of the push-event transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    #[default]
    Closed,
}

pub type FrameListener = Arc<dyn Fn(ServerFrame) + Send + Sync>;
pub type StateListener = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// The push-event collaborator.
///
/// Delivery is at-least-once and unordered. Subscribe requests sent while the
/// connection is down may be dropped by an implementation; the client re-sends
/// every active subscription when the connection (re)opens.
pub trait EventTransport: Send + Sync + 'static {
    fn subscribe(&self, request: SubscriptionRequest);
    fn unsubscribe(&self, request: UnsubscribeRequest);
    fn set_frame_listener(&self, listener: FrameListener);
    fn set_state_listener(&self, listener: StateListener);

    fn open(&self) {}
    fn close(&self) {}
}

/// Caller-supplied cancellation for in-flight operations.
///
/// Canceling aborts only the awaits guarded by this token: a deduplicated
/// dispatch shared with other callers keeps running for them, while the
/// canceled caller observes [`ApiError::Aborted`] and rolls back its own
/// speculative write.
#[derive(Clone, Default)]
pub struct CancelToken {
    handles: Arc<Mutex<Vec<AbortHandle>>>,
    canceled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
        let handles = std::mem::take(&mut *self.handles.lock().unwrap());
        for handle in handles {
            handle.abort();
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Await `fut` unless the token is (or becomes) canceled.
    pub(crate) async fn guard(&self, fut: impl Future<Output = DispatchResult>) -> DispatchResult {
        let (handle, registration) = AbortHandle::new_pair();
        self.handles.lock().unwrap().push(handle.clone());
        if self.is_canceled() {
            handle.abort();
        }
        match Abortable::new(fut, registration).await {
            Ok(result) => result,
            Err(futures::future::Aborted) => Err(ApiError::Aborted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_decodes_typed_payloads() {
        let reply = ApiReply::new(json!({"user_id": "ana"}));

        #[derive(serde::Deserialize)]
        struct Login {
            user_id: String,
        }

        let login: Login = reply.decode().unwrap();
        assert_eq!(login.user_id, "ana");

        let err = reply.decode::<Vec<u32>>().unwrap_err();
        assert!(matches!(err, ApiError::Server { .. }));
    }

    #[test]
    fn call_reports_its_op_key() {
        let call = ApiCall::new("messages", "create", json!({}));
        assert_eq!(call.op_key().to_string(), "messages.create");
    }

    #[test]
    fn canceled_token_aborts_guarded_futures() {
        let token = CancelToken::new();
        token.cancel();
        let result = futures::executor::block_on(
            token.guard(async { Ok(ApiReply::new(serde_json::Value::Null)) }),
        );
        assert_eq!(result.unwrap_err(), ApiError::Aborted);
    }

    #[test]
    fn open_token_passes_results_through() {
        let token = CancelToken::new();
        let result = futures::executor::block_on(
            token.guard(async { Ok(ApiReply::new(serde_json::Value::Null)) }),
        );
        assert!(result.is_ok());
    }
}
