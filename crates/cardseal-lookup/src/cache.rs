//! Coalescing fetch cache.
//!
//! Guards a single-value async fetch per key:
//!
//! - the last successful value is kept until invalidated
//! - concurrent requests for the same key share one underlying fetch
//! - the one result (success or error) is delivered to every waiter in
//!   arrival order
//! - failures are never cached, so the next request retries
//!
//! Per-key state is an explicit [`Slot`]: absent, `InFlight(waiters)`, or
//! `Resolved(value)`. All transitions happen under one `std::sync::Mutex`;
//! waiters are completed after the lock is released, one after another on
//! the task that finished the fetch.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

type Completion<V, E> = Box<dyn FnOnce(Result<V, E>) + Send>;
type Takeover<V, E> = Box<dyn FnOnce(Completion<V, E>) + Send>;

enum Waiter<V, E> {
    /// A caller awaiting [`CoalescingCache::get`].
    Task(oneshot::Sender<Result<V, E>>),
    /// A [`CoalescingCache::provide`] completion. `takeover` resubmits it
    /// with its own fetch if the running fetch is abandoned; the fetch
    /// leader has none.
    Callback {
        completion: Completion<V, E>,
        takeover: Option<Takeover<V, E>>,
    },
}

impl<V: Clone, E: Clone> Waiter<V, E> {
    fn deliver(self, result: &Result<V, E>) {
        match self {
            // A waiter that stopped listening is not an error.
            Self::Task(sender) => {
                let _ = sender.send(result.clone());
            }
            Self::Callback { completion, .. } => completion(result.clone()),
        }
    }
}

enum Slot<V, E> {
    /// A fetch is running; waiters are completed in arrival order.
    InFlight(Vec<Waiter<V, E>>),
    /// Last successful value. Immutable until invalidated.
    Resolved(V),
}

type Slots<K, V, E> = Mutex<HashMap<K, Slot<V, E>>>;

/// Per-key coalescing cache.
///
/// Clones share the same slots.
pub struct CoalescingCache<K, V, E> {
    slots: Arc<Slots<K, V, E>>,
}

impl<K, V, E> Clone for CoalescingCache<K, V, E> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<K, V, E> Default for CoalescingCache<K, V, E> {
    fn default() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V, E> std::fmt::Debug for CoalescingCache<K, V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let in_flight = slots
            .values()
            .filter(|slot| matches!(slot, Slot::InFlight(_)))
            .count();
        f.debug_struct("CoalescingCache")
            .field("keys", &slots.len())
            .field("in_flight", &in_flight)
            .finish()
    }
}

fn lock<K, V, E>(slots: &Arc<Slots<K, V, E>>) -> MutexGuard<'_, HashMap<K, Slot<V, E>>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K, V, E> CoalescingCache<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous fast path: the resolved value for `key`, if any.
    #[must_use]
    pub fn cached(&self, key: &K) -> Option<V> {
        match lock(&self.slots).get(key) {
            Some(Slot::Resolved(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// `true` while a fetch for `key` is running.
    #[must_use]
    pub fn is_in_flight(&self, key: &K) -> bool {
        matches!(lock(&self.slots).get(key), Some(Slot::InFlight(_)))
    }

    /// Return the value for `key`, running `fetch` only if no value is
    /// cached and no other fetch for `key` is in flight.
    ///
    /// A resolved key returns without awaiting. If the caller driving a
    /// fetch is dropped before it finishes, its waiters re-enter and one of
    /// them runs the fetch instead.
    ///
    /// # Errors
    ///
    /// Returns the fetch error verbatim. Errors are not cached.
    pub async fn get<F, Fut>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        loop {
            let receiver = {
                let mut slots = lock(&self.slots);
                match slots.get_mut(&key) {
                    Some(Slot::Resolved(value)) => return Ok(value.clone()),
                    Some(Slot::InFlight(waiters)) => {
                        let (sender, receiver) = oneshot::channel();
                        waiters.push(Waiter::Task(sender));
                        receiver
                    }
                    None => {
                        slots.insert(key.clone(), Slot::InFlight(Vec::new()));
                        break;
                    }
                }
            };
            match receiver.await {
                Ok(result) => return result,
                // Leader dropped mid-fetch: take another turn.
                Err(_) => continue,
            }
        }

        let leader = Leader {
            slots: &self.slots,
            key: Some(key),
        };
        let result = fetch().await;
        leader.complete(result)
    }

    /// Callback form of [`get`](Self::get).
    ///
    /// A resolved key calls `completion` synchronously on the caller's
    /// stack with no fetch. Otherwise `completion` joins the key's waiters
    /// before this returns: the first caller marks the key in flight and
    /// spawns `fetch`, later callers queue behind it. Completions run in
    /// call order on the task that finished the fetch.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime and the key is neither
    /// cached nor in flight.
    pub fn provide<F, Fut, C>(&self, key: K, fetch: F, completion: C)
    where
        K: Send + 'static,
        V: Send + 'static,
        E: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        C: FnOnce(Result<V, E>) + Send + 'static,
    {
        self.submit(key, fetch, Box::new(completion));
    }

    fn submit<F, Fut>(&self, key: K, fetch: F, completion: Completion<V, E>)
    where
        K: Send + 'static,
        V: Send + 'static,
        E: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let mut slots = lock(&self.slots);
        match slots.get_mut(&key) {
            Some(Slot::Resolved(value)) => {
                let value = value.clone();
                drop(slots);
                completion(Ok(value));
            }
            Some(Slot::InFlight(waiters)) => {
                let cache = self.clone();
                waiters.push(Waiter::Callback {
                    completion,
                    takeover: Some(Box::new(move |completion| {
                        cache.submit(key, fetch, completion);
                    })),
                });
            }
            None => {
                let waiters = vec![Waiter::Callback {
                    completion,
                    takeover: None,
                }];
                slots.insert(key.clone(), Slot::InFlight(waiters));
                drop(slots);

                let slots = Arc::clone(&self.slots);
                tokio::spawn(async move {
                    let leader = Leader {
                        slots: &slots,
                        key: Some(key),
                    };
                    let result = fetch().await;
                    let _delivered = leader.complete(result);
                });
            }
        }
    }

    /// Drop the resolved value for `key`. A fetch already in flight is left
    /// to finish.
    pub fn invalidate(&self, key: &K) {
        let mut slots = lock(&self.slots);
        if matches!(slots.get(key), Some(Slot::Resolved(_))) {
            slots.remove(key);
        }
    }

    /// Drop every resolved value. Fetches in flight are left to finish.
    pub fn clear(&self) {
        lock(&self.slots).retain(|_, slot| matches!(slot, Slot::InFlight(_)));
    }
}

/// Owns the `InFlight` slot of the fetch it is driving.
///
/// Dropped without [`complete`](Self::complete) (cancellation or panic),
/// it removes the slot: awaiting callers retry and queued completions are
/// resubmitted with their own fetch, so nobody hangs.
struct Leader<'a, K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    slots: &'a Arc<Slots<K, V, E>>,
    key: Option<K>,
}

impl<K, V, E> Leader<'_, K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    fn take_waiters(&self, key: &K, result: Option<&Result<V, E>>) -> Vec<Waiter<V, E>> {
        let mut slots = lock(self.slots);
        let waiters = match slots.remove(key) {
            Some(Slot::InFlight(waiters)) => waiters,
            _ => Vec::new(),
        };
        if let Some(Ok(value)) = result {
            slots.insert(key.clone(), Slot::Resolved(value.clone()));
        }
        waiters
    }

    fn complete(mut self, result: Result<V, E>) -> Result<V, E> {
        let Some(key) = self.key.take() else {
            return result;
        };
        for waiter in self.take_waiters(&key, Some(&result)) {
            waiter.deliver(&result);
        }
        result
    }
}

impl<K, V, E> Drop for Leader<'_, K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    fn drop(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };
        let waiters = self.take_waiters(&key, None);
        // Resubmitting spawns a fetch; without a runtime the completions
        // can only be dropped.
        if tokio::runtime::Handle::try_current().is_err() {
            return;
        }
        for waiter in waiters {
            if let Waiter::Callback {
                completion,
                takeover: Some(takeover),
            } = waiter
            {
                takeover(completion);
            }
        }
    }
}
