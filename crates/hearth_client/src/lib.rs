//! # hearth_client
//!
//! The client-side state synchronization engine behind hearth's messaging
//! and membership features, with Leptos integration.
//!
//! Three sources of truth feed one normalized entity cache: speculative
//! (optimistic) local edits, authoritative request/response replies, and
//! push-delivered real-time events. All of them write through the store's
//! single `upsert`/`remove` pair, so the merge behavior cannot diverge
//! between paths.
//!
//! ## Pieces
//!
//! - [`store`]: normalized per-kind collections, ordered paginated lists,
//!   snapshot/rollback, last-write-wins resolution.
//! - [`status`]: per-operation lifecycle (`idle`/`pending`/`succeeded`/
//!   `failed`) with retained last errors.
//! - [`dedupe`]: single-flight deduplication for operations without natural
//!   request identifiers (login, session init).
//! - [`mutation`]: the optimistic protocol: snapshot, speculative apply,
//!   dispatch, reconcile-or-rollback.
//! - [`reconcile`]: push events applied through the same store primitives.
//! - [`actions`]: one dispatchable function per mutation the UI can trigger.
//! - [`context`] / [`hooks`] / [`provider`]: the reactive surface UI code
//!   depends on.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use hearth_client::{SyncProvider, use_messages, use_operation, actions::ops};
//!
//! #[component]
//! fn ThreadView(thread_id: ThreadId) -> impl IntoView {
//!     let messages = use_messages(thread_id.clone());
//!     let create = use_operation(ops::MESSAGES_CREATE);
//!     let ctx = use_sync_context();
//!
//!     let send = move |content: String| {
//!         let client = ctx.client();
//!         let thread_id = thread_id.clone();
//!         leptos::task::spawn_local(async move {
//!             // The speculative message is already visible; the await is
//!             // only needed for follow-on effects (e.g. uploads).
//!             let _ = client
//!                 .create_message(MessageDraft::text(thread_id, content), None)
//!                 .await;
//!         });
//!     };
//!
//!     view! { /* ... */ }
//! }
//! ```

pub mod actions;
mod client;
mod context;
mod dedupe;
mod hooks;
mod mutation;
mod provider;
mod reconcile;
mod status;
mod store;
pub mod testing;
mod transport;

pub use client::HearthClient;
pub use context::{SyncConnection, SyncContext};
pub use dedupe::RequestDeduplicator;
pub use mutation::{MutationPlan, Mutator, Reconcile};
pub use reconcile::{apply_batch, apply_event};
pub use status::{OpKey, OperationState, OperationStatus, OperationTracker};
pub use store::{
    ChangeListener, Collection, EntityStore, SharedStore, Snapshot, StoreCollection,
    resolve_write,
};
pub use transport::{
    ApiCall, ApiReply, CancelToken, ConnectionState, DispatchResult, EventTransport,
    FrameListener, RequestTransport, StateListener,
};

pub use hooks::{
    use_connection, use_current_user, use_households, use_members, use_message,
    use_message_pagination, use_message_poll, use_messages, use_operation, use_poll,
    use_sync_context, use_thread, use_thread_pagination, use_threads,
};

pub use provider::SyncProvider;
#[cfg(target_arch = "wasm32")]
pub use provider::{WsEventTransport, WsSyncProvider};

// Re-export the error taxonomy and pagination types for convenience.
pub use hearth_common::{ApiError, ErrorKind, PageMeta, PageQuery, PaginationState};
