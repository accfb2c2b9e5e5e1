//! Per-operation lifecycle tracking.
//!
//! Every named logical operation ("create message", "vote poll") has exactly
//! one status record, keyed by [`OpKey`], so unrelated UI can render
//! independent loading and error states.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::store::ChangeListener;

/// Namespaced operation key: `<slice>.<action>`, e.g. `messages.create`.
///
/// Multiple entity instances sharing one key (adding a reaction on many
/// messages) share one status record: loading state is tracked per
/// operation class, not per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpKey {
    pub slice: &'static str,
    pub action: &'static str,
}

impl OpKey {
    pub const fn new(slice: &'static str, action: &'static str) -> Self {
        Self { slice, action }
    }
}

impl std::fmt::Display for OpKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.slice, self.action)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperationStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// Current lifecycle state of one operation class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationState {
    pub status: OperationStatus,
    /// Last error message; retained until the next `begin` or an explicit
    /// clear.
    pub error: Option<String>,
}

impl OperationState {
    pub fn is_idle(&self) -> bool {
        self.status == OperationStatus::Idle
    }

    pub fn is_pending(&self) -> bool {
        self.status == OperationStatus::Pending
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == OperationStatus::Succeeded
    }

    pub fn is_failed(&self) -> bool {
        self.status == OperationStatus::Failed
    }
}

/// Records the lifecycle of every named operation independently.
///
/// Transitions follow `idle -> pending -> (succeeded | failed)`; `begin`
/// clears the previous error. Concurrent triggers of the same key do not fork
/// state; they share the one record (see the request deduplicator).
#[derive(Clone, Default)]
pub struct OperationTracker {
    ops: Arc<Mutex<HashMap<OpKey, OperationState>>>,
    listener: Arc<Mutex<Option<ChangeListener>>>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, op: OpKey) {
        self.set(op, OperationStatus::Pending, None);
    }

    pub fn succeed(&self, op: OpKey) {
        if !self.get(op).is_pending() {
            log::warn!("[status] {op} succeeded without a pending begin");
        }
        self.set(op, OperationStatus::Succeeded, None);
    }

    pub fn fail(&self, op: OpKey, message: impl Into<String>) {
        if !self.get(op).is_pending() {
            log::warn!("[status] {op} failed without a pending begin");
        }
        self.set(op, OperationStatus::Failed, Some(message.into()));
    }

    pub fn reset(&self, op: OpKey) {
        self.set(op, OperationStatus::Idle, None);
    }

    /// Clear the retained error without touching the status.
    pub fn clear_error(&self, op: OpKey) {
        {
            let mut ops = self.ops.lock().unwrap();
            if let Some(state) = ops.get_mut(&op) {
                state.error = None;
            }
        }
        self.notify();
    }

    pub fn get(&self, op: OpKey) -> OperationState {
        self.ops
            .lock()
            .unwrap()
            .get(&op)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_listener(&self, listener: ChangeListener) {
        *self.listener.lock().unwrap() = Some(listener);
    }

    fn set(&self, op: OpKey, status: OperationStatus, error: Option<String>) {
        {
            let mut ops = self.ops.lock().unwrap();
            let state = ops.entry(op).or_default();
            state.status = status;
            state.error = error;
        }
        self.notify();
    }

    fn notify(&self) {
        let listener = self.listener.lock().unwrap().clone();
        if let Some(listener) = listener {
            listener();
        }
    }
}
