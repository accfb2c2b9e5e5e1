//! Provider components that wire transports into a [`SyncContext`].
//!
//! [`SyncProvider`] accepts any transport pair (tests and native shells
//! inject their own). On wasm, [`WsSyncProvider`] builds the WebSocket
//! event transport from a URL and handles frame decoding.

use std::sync::Arc;

use leptos::prelude::*;

use crate::client::HearthClient;
use crate::context::SyncContext;
use crate::transport::{EventTransport, RequestTransport};

/// Provider component that builds the client and provides [`SyncContext`].
///
/// Wrap the part of the application that needs synchronized data.
///
/// # Example
///
/// ```rust,ignore
/// #[component]
/// pub fn App() -> impl IntoView {
///     let transport: Arc<dyn RequestTransport> = Arc::new(HttpTransport::new("/api"));
///     let events: Arc<dyn EventTransport> = Arc::new(my_event_transport());
///
///     view! {
///         <SyncProvider transport events>
///             <AppShell/>
///         </SyncProvider>
///     }
/// }
/// ```
#[component]
pub fn SyncProvider(
    /// Request/response transport for API calls.
    transport: Arc<dyn RequestTransport>,
    /// Push-event transport delivering server frames.
    events: Arc<dyn EventTransport>,
    children: Children,
) -> impl IntoView {
    let client = HearthClient::new(transport, events);
    let ctx = SyncContext::new(client);
    provide_context(ctx);
    children()
}

#[cfg(target_arch = "wasm32")]
mod ws {
    use std::sync::{Arc, Mutex};

    use leptos::prelude::*;
    use leptos_use::core::ConnectionReadyState;
    use leptos_use::{
        DummyEncoder, UseWebSocketOptions, UseWebSocketReturn, use_websocket_with_options,
    };

    use hearth_common::codec::{FrameCodec, decode_batch};
    use hearth_sync::{ClientFrame, ServerFrame, SubscriptionRequest, UnsubscribeRequest};

    use crate::client::HearthClient;
    use crate::context::SyncContext;
    use crate::transport::{
        ConnectionState, EventTransport, FrameListener, RequestTransport, StateListener,
    };

    fn map_ready_state(state: ConnectionReadyState) -> ConnectionState {
        match state {
            ConnectionReadyState::Connecting => ConnectionState::Connecting,
            ConnectionReadyState::Open => ConnectionState::Open,
            ConnectionReadyState::Closing => ConnectionState::Closing,
            ConnectionReadyState::Closed => ConnectionState::Closed,
        }
    }

    type SendFrame = Arc<dyn Fn(&ClientFrame) + Send + Sync>;
    type Control = Arc<dyn Fn() + Send + Sync>;

    /// WebSocket-backed event transport.
    ///
    /// Subscribe frames sent while the socket is down are dropped here; the
    /// client re-sends every active subscription on the open transition.
    pub struct WsEventTransport {
        send: Mutex<Option<SendFrame>>,
        open: Mutex<Option<Control>>,
        close: Mutex<Option<Control>>,
        frame_listener: Mutex<Option<FrameListener>>,
        state_listener: Mutex<Option<StateListener>>,
    }

    impl WsEventTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                send: Mutex::new(None),
                open: Mutex::new(None),
                close: Mutex::new(None),
                frame_listener: Mutex::new(None),
                state_listener: Mutex::new(None),
            })
        }

        fn wire(&self, send: SendFrame, open: Control, close: Control) {
            *self.send.lock().unwrap() = Some(send);
            *self.open.lock().unwrap() = Some(open);
            *self.close.lock().unwrap() = Some(close);
        }

        fn send_frame(&self, frame: &ClientFrame) {
            let send = self.send.lock().unwrap().clone();
            match send {
                Some(send) => send(frame),
                None => log::warn!("[ws] dropping frame, socket not wired yet"),
            }
        }

        fn dispatch_frame(&self, frame: ServerFrame) {
            let listener = self.frame_listener.lock().unwrap().clone();
            if let Some(listener) = listener {
                listener(frame);
            }
        }

        fn set_state(&self, state: ConnectionState) {
            let listener = self.state_listener.lock().unwrap().clone();
            if let Some(listener) = listener {
                listener(state);
            }
        }
    }

    impl EventTransport for WsEventTransport {
        fn subscribe(&self, request: SubscriptionRequest) {
            self.send_frame(&ClientFrame::Subscribe(request));
        }

        fn unsubscribe(&self, request: UnsubscribeRequest) {
            self.send_frame(&ClientFrame::Unsubscribe(request));
        }

        fn set_frame_listener(&self, listener: FrameListener) {
            *self.frame_listener.lock().unwrap() = Some(listener);
        }

        fn set_state_listener(&self, listener: StateListener) {
            *self.state_listener.lock().unwrap() = Some(listener);
        }

        fn open(&self) {
            let open = self.open.lock().unwrap().clone();
            if let Some(open) = open {
                open();
            }
        }

        fn close(&self) {
            let close = self.close.lock().unwrap().clone();
            if let Some(close) = close {
                close();
            }
        }
    }

    /// Provider that connects the event transport over a WebSocket.
    #[component]
    pub fn WsSyncProvider(
        /// WebSocket URL for push events.
        url: String,
        /// Request/response transport for API calls.
        transport: Arc<dyn RequestTransport>,
        /// Whether to connect on mount (default: true).
        #[prop(optional)]
        auto_connect: Option<bool>,
        children: Children,
    ) -> impl IntoView {
        let auto_connect = auto_connect.unwrap_or(true);
        let events = WsEventTransport::new();

        let events_for_messages = events.clone();
        let UseWebSocketReturn {
            ready_state,
            send: raw_send,
            open,
            close,
            ..
        } = use_websocket_with_options::<ClientFrame, ServerFrame, FrameCodec, (), DummyEncoder>(
            &url,
            UseWebSocketOptions::default()
                .immediate(auto_connect)
                .on_message_raw_bytes(Arc::new(move |data: &[u8]| {
                    // The server may batch several frames per socket message.
                    for frame in decode_batch::<ServerFrame>(data) {
                        events_for_messages.dispatch_frame(frame);
                    }
                })),
        );

        events.wire(
            Arc::new(move |frame: &ClientFrame| raw_send(frame)),
            Arc::new(move || open()),
            Arc::new(move || close()),
        );

        let client = HearthClient::new(transport, events.clone());
        let ctx = SyncContext::new(client);
        provide_context(ctx);

        // Forward socket state into the transport's listener.
        let events_for_state = events.clone();
        Effect::new(move |_| {
            events_for_state.set_state(map_ready_state(ready_state.get()));
        });

        children()
    }
}

#[cfg(target_arch = "wasm32")]
pub use ws::{WsEventTransport, WsSyncProvider};
