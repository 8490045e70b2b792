//! Request coalescing.
//!
//! [`Group`] deduplicates concurrent calls that share a key: the first caller
//! starts the work, later callers with the same key attach to it, and everyone
//! receives a clone of the same output.
//!
//! The window is "currently in flight", not time based. The entry for a key
//! is removed as soon as its call finishes, so the next request starts a fresh
//! call.
//!
//! # Cancellation
//!
//! The call runs in the context of the caller that started it. Dropping that
//! caller's future aborts the work and every caller that joined it receives
//! [`Aborted`]. Dropping a caller that only joined detaches that caller alone.

// Mutex.lock().unwrap() only panics on lock poisoning (prior panic while
// holding the lock). The lock is never held across an await.
#![allow(clippy::unwrap_used)]

use futures_util::future::{
    AbortHandle, Abortable, Aborted, BoxFuture, FutureExt, Shared, WeakShared,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type Calls<T> = Arc<Mutex<HashMap<String, Call<T>>>>;

type SharedCall<T> = Shared<BoxFuture<'static, Result<T, Aborted>>>;

struct Call<T> {
    id: u64,
    fut: WeakShared<BoxFuture<'static, Result<T, Aborted>>>,
}

/// Single-flight group keyed by string.
pub struct Group<T> {
    calls: Calls<T>,
    next_id: AtomicU64,
}

impl<T> Default for Group<T> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Group<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` under `key`, or join a call already in flight for it.
    ///
    /// `work` is only polled if this caller starts the call. Returns
    /// [`Aborted`] when the caller that started the call was dropped first.
    pub async fn run<F>(&self, key: &str, work: F) -> Result<T, Aborted>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let (shared, _starter) = self.join_or_start(key, work);
        shared.await
    }

    /// Number of keys with a call in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn join_or_start<F>(&self, key: &str, work: F) -> (SharedCall<T>, Option<Starter<T>>)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let mut calls = self.calls.lock().unwrap();
        if let Some(shared) = calls.get(key).and_then(|c| c.fut.upgrade()) {
            tracing::trace!(key, "joining in-flight call");
            return (shared, None);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (handle, registration) = AbortHandle::new_pair();
        let guard = self.forget(key, id);
        let shared = async move {
            let _guard = guard;
            Abortable::new(work, registration).await
        }
        .boxed()
        .shared();
        // downgrade only fails on a completed future; this one was never polled
        if let Some(fut) = shared.downgrade() {
            calls.insert(key.to_string(), Call { id, fut });
        }
        let starter = Starter {
            handle,
            _forget: self.forget(key, id),
        };
        (shared, Some(starter))
    }

    fn forget(&self, key: &str, id: u64) -> Forget<T> {
        Forget {
            calls: Arc::clone(&self.calls),
            key: key.to_string(),
            id,
        }
    }
}

/// Held by the caller that started a call; aborts the call when dropped.
///
/// Aborting a call that already finished has no effect on its output.
struct Starter<T> {
    handle: AbortHandle,
    _forget: Forget<T>,
}

impl<T> Drop for Starter<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Removes a call's entry when its work completes or is dropped.
struct Forget<T> {
    calls: Calls<T>,
    key: String,
    id: u64,
}

impl<T> Drop for Forget<T> {
    fn drop(&mut self) {
        let mut calls = match self.calls.lock() {
            Ok(calls) => calls,
            Err(poisoned) => poisoned.into_inner(),
        };
        // a newer call may already own the key
        if calls.get(&self.key).is_some_and(|c| c.id == self.id) {
            calls.remove(&self.key);
        }
    }
}
