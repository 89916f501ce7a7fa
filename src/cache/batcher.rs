use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::error::{BookingError, Result};
use crate::metrics::CacheMetrics;

type SharedFetch<T> = Shared<BoxFuture<'static, std::result::Result<T, Arc<BookingError>>>>;

struct PendingFetch<T> {
    generation: u64,
    fetch: SharedFetch<T>,
}

struct CacheEntry<T> {
    value: T,
    stored_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl
    }
}

struct Inner<T> {
    pending: Mutex<HashMap<String, PendingFetch<T>>>,
    cache: Mutex<HashMap<String, CacheEntry<T>>>,
    /// Bumped by every invalidation; operations started before it are not cached.
    generation: AtomicU64,
}

impl<T: Clone> Inner<T> {
    /// Runs once per operation, when it completes.
    ///
    /// The cache entry goes in before the pending entry comes out, so a caller
    /// arriving in between still finds one of them.
    fn settle(&self, key: &str, started: u64, result: &std::result::Result<T, Arc<BookingError>>, ttl: Duration) {
        match result {
            Ok(value) => {
                let mut cache = lock(&self.cache);
                if self.generation.load(Ordering::SeqCst) == started {
                    cache.insert(
                        key.to_string(),
                        CacheEntry { value: value.clone(), stored_at: Instant::now(), ttl },
                    );
                } else {
                    debug!("Query '{}' was invalidated while running, not cached", key);
                }
            }
            Err(e) => debug!("Query '{}' failed, not cached: {}", key, e),
        }

        let mut pending = lock(&self.pending);
        if pending.get(key).map_or(false, |p| p.generation == started) {
            pending.remove(key);
        }
    }

    /// Invalidates everything in flight and drops the matching keys from both maps.
    fn clear_where(&self, matches: impl Fn(&str) -> bool) -> usize {
        let mut pending = lock(&self.pending);
        let mut cache = lock(&self.cache);
        self.generation.fetch_add(1, Ordering::SeqCst);
        pending.retain(|key, _| !matches(key.as_str()));
        let before = cache.len();
        cache.retain(|key, _| !matches(key.as_str()));
        before - cache.len()
    }
}

fn fresh<T: Clone>(cache: &mut HashMap<String, CacheEntry<T>>, key: &str) -> Option<T> {
    match cache.get(key) {
        Some(entry) if entry.is_fresh(Instant::now()) => Some(entry.value.clone()),
        Some(_) => {
            cache.remove(key);
            None
        }
        None => None,
    }
}

/// Deduplicating, TTL-expiring cache for database reads.
///
/// A read returns the cached value while it is fresh; otherwise it joins the
/// operation already in flight for the same key, or starts a new one. Only
/// successful results are cached. There is no size bound and no eviction
/// beyond expiry and explicit clearing.
pub struct QueryBatcher<T> {
    inner: Arc<Inner<T>>,
    default_ttl: Duration,
}

impl<T> Clone for QueryBatcher<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), default_ttl: self.default_ttl }
    }
}

impl<T> QueryBatcher<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(HashMap::new()),
                cache: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.get_or_fetch_with_ttl(key, self.default_ttl, fetch).await
    }

    #[instrument(skip(self, fetch), level = "debug")]
    pub async fn get_or_fetch_with_ttl<F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if let Some(value) = self.cached(key) {
            CacheMetrics::record_hit();
            return Ok(value);
        }

        let shared = {
            let mut pending = lock(&self.inner.pending);
            match pending.get(key) {
                Some(in_flight) => {
                    CacheMetrics::record_joined();
                    in_flight.fetch.clone()
                }
                None => {
                    // An operation may have settled since the cache check above
                    if let Some(value) = fresh(&mut *lock(&self.inner.cache), key) {
                        CacheMetrics::record_hit();
                        return Ok(value);
                    }
                    CacheMetrics::record_miss();
                    let inner = Arc::clone(&self.inner);
                    let owned_key = key.to_string();
                    let started = self.inner.generation.load(Ordering::SeqCst);
                    let operation = fetch();
                    let shared = async move {
                        let result = operation.await.map_err(Arc::new);
                        inner.settle(&owned_key, started, &result, ttl);
                        result
                    }
                    .boxed()
                    .shared();
                    pending.insert(key.to_string(), PendingFetch { generation: started, fetch: shared.clone() });
                    shared
                }
            }
        };

        shared.await.map_err(BookingError::Batched)
    }

    /// Fresh cached value for `key`, dropping it if expired.
    pub fn cached(&self, key: &str) -> Option<T> {
        fresh(&mut *lock(&self.inner.cache), key)
    }

    /// Removes every cached key containing `pattern`. Returns how many were removed.
    ///
    /// Operations still running for any key finish for their current callers
    /// but do not repopulate the cache.
    pub fn clear_cache(&self, pattern: &str) -> usize {
        let removed = self.inner.clear_where(|key| key.contains(pattern));
        debug!("Cleared {} cached queries matching '{}'", removed, pattern);
        removed
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.clear_where(|candidate| candidate == key) > 0
    }

    pub fn clear_all(&self) {
        self.inner.clear_where(|_| true);
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.cache).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_flight(&self) -> usize {
        lock(&self.inner.pending).len()
    }
}

// Poisoning is ignored; entries stay consistent between statements.
fn lock<M>(mutex: &Mutex<M>) -> MutexGuard<'_, M> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
