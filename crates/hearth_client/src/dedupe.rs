//! Single-flight request deduplication.
//!
//! Actions without a natural request identifier (login, session init) can be
//! fired twice by a double-click or a component re-render. Routing them
//! through a shared key guarantees at most one concurrent dispatch: late
//! callers join the in-flight future and receive the same settled result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::transport::DispatchResult;

type InFlight = Shared<BoxFuture<'static, DispatchResult>>;

#[derive(Clone, Default)]
pub struct RequestDeduplicator {
    in_flight: Arc<Mutex<HashMap<String, InFlight>>>,
}

impl RequestDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `factory` under `key`, or join the dispatch already in flight for
    /// it. Once the dispatch settles, success or failure, the key is
    /// released and the next call starts fresh.
    ///
    /// The factory runs before the slot is inserted, so a synchronous panic
    /// inside it leaves no entry behind to block retries.
    pub async fn dedupe<F>(&self, key: &str, factory: F) -> DispatchResult
    where
        F: FnOnce() -> BoxFuture<'static, DispatchResult>,
    {
        let shared = {
            let mut in_flight = self.in_flight.lock().unwrap();
            if let Some(existing) = in_flight.get(key) {
                log::debug!("[dedupe] joining in-flight request for {key}");
                existing.clone()
            } else {
                let fut = factory();
                let slot = self.in_flight.clone();
                let release_key = key.to_string();
                let wrapped: BoxFuture<'static, DispatchResult> = Box::pin(async move {
                    let result = fut.await;
                    slot.lock().unwrap().remove(&release_key);
                    result
                });
                let shared = wrapped.shared();
                in_flight.insert(key.to_string(), shared.clone());
                shared
            }
        };
        shared.await
    }

    /// Drop the in-flight entry for `key` without waiting for it to settle.
    ///
    /// Used when a caller cancels: callers already joined to the shared
    /// future are unaffected, but new callers start a fresh dispatch instead
    /// of joining one nobody may be polling anymore.
    pub fn release(&self, key: &str) {
        self.in_flight.lock().unwrap().remove(key);
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight.lock().unwrap().contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::channel::oneshot;
    use hearth_common::ApiError;
    use serde_json::json;

    use crate::transport::ApiReply;

    fn reply(value: serde_json::Value) -> DispatchResult {
        Ok(ApiReply::new(value))
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_dispatch() {
        let dedupe = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel::<()>();
        let rx = rx.shared();

        let factory = |calls: Arc<AtomicUsize>, rx: Shared<oneshot::Receiver<()>>| {
            move || -> BoxFuture<'static, DispatchResult> {
                calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move {
                    let _ = rx.await;
                    reply(json!({"user_id": "ana"}))
                })
            }
        };

        let first = dedupe.dedupe("session.login", factory(calls.clone(), rx.clone()));
        let second = dedupe.dedupe("session.login", factory(calls.clone(), rx.clone()));

        let release = async move {
            tokio::task::yield_now().await;
            let _ = tx.send(());
        };

        let (a, b, _) = tokio::join!(first, second, release);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[tokio::test]
    async fn key_is_released_after_settling() {
        let dedupe = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            let result = dedupe
                .dedupe("session.initialize", move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Box::pin(async { reply(json!(null)) })
                })
                .await;
            assert!(result.is_ok());
            assert!(!dedupe.is_in_flight("session.initialize"));
        }

        // Sequential calls each dispatch: deduplication is for overlap only.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn joined_callers_share_failures_too() {
        let dedupe = RequestDeduplicator::new();
        let (tx, rx) = oneshot::channel::<()>();
        let rx = rx.shared();

        let failing = |rx: Shared<oneshot::Receiver<()>>| {
            move || -> BoxFuture<'static, DispatchResult> {
                Box::pin(async move {
                    let _ = rx.await;
                    Err(ApiError::Unauthorized)
                })
            }
        };

        let first = dedupe.dedupe("session.login", failing(rx.clone()));
        let second = dedupe.dedupe("session.login", failing(rx.clone()));
        let release = async move {
            tokio::task::yield_now().await;
            let _ = tx.send(());
        };

        let (a, b, _) = tokio::join!(first, second, release);
        assert_eq!(a.unwrap_err(), ApiError::Unauthorized);
        assert_eq!(b.unwrap_err(), ApiError::Unauthorized);
    }

    #[tokio::test]
    async fn different_keys_do_not_share() {
        let dedupe = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let make = |calls: Arc<AtomicUsize>| {
            move || -> BoxFuture<'static, DispatchResult> {
                calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { reply(json!(null)) })
            }
        };

        let (a, b) = tokio::join!(
            dedupe.dedupe("session.login", make(calls.clone())),
            dedupe.dedupe("session.initialize", make(calls.clone()))
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
