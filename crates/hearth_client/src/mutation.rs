//! The optimistic mutation engine.
//!
//! Every mutating operation follows the same protocol: snapshot the entities
//! it will touch, apply a speculative write immediately, dispatch the request
//! (deduplicated and abortable), then either replace the speculative entity
//! with the server's authoritative copy or restore the snapshot verbatim.
//!
//! A real-time event for the same entity may land while the mutation is
//! pending; it is applied immediately and unconditionally, and the mutation's
//! reconciliation will in turn overwrite it when it resolves. This
//! last-write-wins race is deliberate and documented on
//! [`crate::store::resolve_write`].

use std::sync::Arc;

use futures::future::BoxFuture;

use hearth_common::ApiError;
use hearth_model::{Entity, EntityKind, EntityRef, ListKey};

use crate::dedupe::RequestDeduplicator;
use crate::status::{OpKey, OperationTracker};
use crate::store::{SharedStore, dedup_refs};
use crate::transport::{ApiCall, ApiReply, CancelToken, DispatchResult, RequestTransport};

/// How a successful reply is folded back into the store.
#[derive(Debug, Clone)]
pub enum Reconcile {
    /// Status bookkeeping only; the action handles its own store writes
    /// (session calls, list fetches).
    None,
    /// Replace the speculative entity with the reply's authoritative copy.
    /// With `temp_id`, the temporary identifier is substituted in place.
    Entity {
        kind: EntityKind,
        temp_id: Option<String>,
    },
    /// The removal was already applied speculatively; the reply only
    /// confirms it.
    Removal(EntityRef),
}

/// Everything one mutation needs: the operation key it reports under, the
/// request to dispatch, the speculative store writes, and the entities to
/// snapshot for rollback.
#[derive(Debug, Clone)]
pub struct MutationPlan {
    pub op: OpKey,
    pub call: ApiCall,
    pub dedupe_key: Option<String>,
    /// Entities read-modified by the speculative write (snapshot-only refs
    /// beyond the speculative entities themselves).
    pub touched: Vec<EntityRef>,
    /// Upserts applied before the request is dispatched.
    pub speculative: Vec<Entity>,
    /// Removals applied before the request is dispatched.
    pub removals: Vec<EntityRef>,
    pub reconcile: Reconcile,
}

impl MutationPlan {
    pub fn new(op: OpKey, call: ApiCall) -> Self {
        Self {
            op,
            call,
            dedupe_key: None,
            touched: Vec::new(),
            speculative: Vec::new(),
            removals: Vec::new(),
            reconcile: Reconcile::None,
        }
    }

    pub fn touch(mut self, target: EntityRef) -> Self {
        self.touched.push(target);
        self
    }

    pub fn speculate(mut self, entity: Entity) -> Self {
        self.speculative.push(entity);
        self
    }

    pub fn remove(mut self, target: EntityRef) -> Self {
        self.removals.push(target);
        self
    }

    pub fn dedupe(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }

    pub fn reconcile(mut self, reconcile: Reconcile) -> Self {
        self.reconcile = reconcile;
        self
    }
}

/// Runs mutation plans against the store, tracker, deduplicator, and
/// transport.
#[derive(Clone)]
pub struct Mutator {
    store: SharedStore,
    tracker: OperationTracker,
    dedupe: RequestDeduplicator,
    transport: Arc<dyn RequestTransport>,
}

impl Mutator {
    pub fn new(
        store: SharedStore,
        tracker: OperationTracker,
        dedupe: RequestDeduplicator,
        transport: Arc<dyn RequestTransport>,
    ) -> Self {
        Self {
            store,
            tracker,
            dedupe,
            transport,
        }
    }

    /// Execute one mutation end to end. On failure of any kind, validation
    /// included, the snapshot is restored in full and the error is both
    /// recorded in the tracker and returned to the caller.
    pub async fn run(&self, plan: MutationPlan, cancel: Option<&CancelToken>) -> DispatchResult {
        let MutationPlan {
            op,
            call,
            dedupe_key,
            touched,
            speculative,
            removals,
            reconcile,
        } = plan;

        self.tracker.begin(op);

        let mut refs = touched;
        refs.extend(speculative.iter().map(Entity::entity_ref));
        refs.extend(removals.iter().cloned());
        dedup_refs(&mut refs);

        // Snapshot and speculative apply happen under one lock, so no reader
        // ever observes a half-applied write.
        let snapshot = self.store.write(|store| {
            let mut lists: Vec<(EntityKind, ListKey)> = speculative
                .iter()
                .filter_map(|e| e.list_key().map(|key| (e.kind(), key)))
                .collect();
            for target in &removals {
                if let Some(entity) = store.get(target) {
                    if let Some(key) = entity.list_key() {
                        lists.push((entity.kind(), key));
                    }
                }
            }

            let snapshot = store.snapshot(&refs, &lists);
            for entity in speculative {
                store.upsert(entity);
            }
            for target in &removals {
                store.remove(target);
            }
            snapshot
        });

        log::debug!("[mutation] {op} dispatched");

        let outcome = match self.dispatch(call, dedupe_key.as_deref(), cancel).await {
            Ok(reply) => self.apply_reconcile(&reconcile, &reply).map(|_| reply),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(reply) => {
                self.tracker.succeed(op);
                Ok(reply)
            }
            Err(err) => {
                if err == ApiError::Aborted {
                    if let Some(key) = &dedupe_key {
                        self.dedupe.release(key);
                    }
                }
                self.store.write(|store| store.restore(snapshot));
                self.tracker.fail(op, err.to_string());
                log::debug!("[mutation] {op} rolled back: {err}");
                Err(err)
            }
        }
    }

    fn apply_reconcile(&self, reconcile: &Reconcile, reply: &ApiReply) -> Result<(), ApiError> {
        match reconcile {
            Reconcile::None => Ok(()),
            Reconcile::Entity { kind, temp_id } => {
                let entity = reply.decode_entity(*kind)?;
                self.store.write(|store| match temp_id {
                    Some(temp) => store.reconcile_id(temp, entity),
                    None => store.upsert(entity),
                });
                Ok(())
            }
            // Already removed speculatively; nothing to re-apply.
            Reconcile::Removal(_) => Ok(()),
        }
    }

    async fn dispatch(
        &self,
        call: ApiCall,
        dedupe_key: Option<&str>,
        cancel: Option<&CancelToken>,
    ) -> DispatchResult {
        let transport = self.transport.clone();
        let fut: BoxFuture<'static, DispatchResult> = match dedupe_key {
            Some(key) => {
                let dedupe = self.dedupe.clone();
                let key = key.to_string();
                Box::pin(async move { dedupe.dedupe(&key, move || transport.call(call)).await })
            }
            None => transport.call(call),
        };
        match cancel {
            Some(token) => token.guard(fut).await,
            None => fut.await,
        }
    }
}
