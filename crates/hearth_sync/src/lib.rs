//! hearth_sync
//!
//! Wire-level protocol types for real-time synchronization between the
//! hearth client and the push-event transport. This crate is intentionally
//! transport-agnostic: it defines the frames, not how they travel.
//!
//! - [`ClientFrame`]: client → server (subscribe / unsubscribe).
//! - [`ServerFrame`]: server → client (welcome, push-event batches).
//! - [`PushEvent`]: the closed sum of entity change events
//!   ({created, updated} carry the full [`hearth_model::Entity`], deleted
//!   carries an [`hearth_model::EntityRef`]), so reconciliation dispatch is
//!   exhaustive and statically checkable.

mod messages;

pub use messages::{
    ClientFrame, EventAction, EventBatch, PushEvent, ServerFrame, SubscriptionRequest, Topic,
    UnsubscribeRequest, Welcome,
};
