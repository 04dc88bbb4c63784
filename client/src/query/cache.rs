//! Keyed cache of server reads.
//!
//! DESIGN
//! ======
//! Entries hold the last successful response as JSON, stamped with when it
//! was fetched and when it was last read. A read is served from the entry
//! while it is younger than the caller's stale time and not invalidated;
//! otherwise it is refetched. Concurrent reads of one key share a single
//! in-flight fetch.
//!
//! Each in-flight fetch carries an id. Only the reader whose id still owns
//! the key stores the result, so a fetch that was invalidated or cleared
//! while running never overwrites the cache. Entries unread for longer than
//! the gc time are dropped on the next read.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::keys::QueryKey;
use super::retry::RetryPolicy;
use crate::config::QueryConfig;
use crate::net::ApiError;

type SharedFetch = Shared<BoxFuture<'static, Result<Value, ApiError>>>;

struct Entry {
    data: Value,
    fetched_at: Instant,
    last_used: Instant,
    invalidated: bool,
}

impl Entry {
    fn is_fresh(&self, now: Instant, stale_time: Duration) -> bool {
        !self.invalidated && now.saturating_duration_since(self.fetched_at) < stale_time
    }
}

struct InFlight {
    id: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, Entry>,
    in_flight: HashMap<QueryKey, InFlight>,
    next_fetch_id: u64,
}

impl CacheState {
    fn collect_garbage(&mut self, now: Instant, gc_time: Duration) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now.saturating_duration_since(entry.last_used) < gc_time);
        let dropped = before - self.entries.len();
        if dropped > 0 {
            tracing::debug!(dropped, "cache entries collected");
        }
    }
}

#[derive(Clone)]
pub struct QueryCache {
    state: Arc<Mutex<CacheState>>,
    config: QueryConfig,
    retry: RetryPolicy,
}

impl QueryCache {
    #[must_use]
    pub fn new(config: QueryConfig) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self { state: Arc::new(Mutex::new(CacheState::default())), config, retry }
    }

    #[must_use]
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Read `key`, fetching it with `fetcher` when no fresh entry exists.
    ///
    /// `fetcher` may be called several times: failed reads are retried with
    /// back-off unless the error is a client error.
    ///
    /// # Errors
    ///
    /// Returns the last fetch error once retries are exhausted, or
    /// [`ApiError::InvalidResponse`] if cached data does not decode as `T`.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, stale_time: Duration, fetcher: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let (id, fetch) = {
            let mut state = self.lock();
            let now = Instant::now();
            state.collect_garbage(now, self.config.gc_time);

            if let Some(entry) = state.entries.get_mut(&key)
                && entry.is_fresh(now, stale_time)
            {
                entry.last_used = now;
                tracing::trace!(%key, "cache hit");
                return decode(&entry.data);
            }

            if let Some(running) = state.in_flight.get(&key) {
                tracing::trace!(%key, "joining in-flight fetch");
                (running.id, running.fetch.clone())
            } else {
                state.next_fetch_id += 1;
                let id = state.next_fetch_id;
                let fetch = self.start_fetch(key.clone(), fetcher);
                state.in_flight.insert(key.clone(), InFlight { id, fetch: fetch.clone() });
                (id, fetch)
            }
        };

        let result = fetch.await;

        let mut state = self.lock();
        if state.in_flight.get(&key).is_some_and(|running| running.id == id) {
            state.in_flight.remove(&key);
            if let Ok(data) = &result {
                let now = Instant::now();
                state.entries.insert(key, Entry { data: data.clone(), fetched_at: now, last_used: now, invalidated: false });
            }
        }
        drop(state);

        decode(&result?)
    }

    fn start_fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> SharedFetch
    where
        T: Serialize + Send + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let policy = self.retry;
        async move {
            let mut retries = 0;
            loop {
                match fetcher().await {
                    Ok(value) => {
                        return serde_json::to_value(value).map_err(|e| ApiError::InvalidResponse(e.to_string()));
                    }
                    Err(err) if policy.should_retry(retries, &err) => {
                        let delay = policy.delay(retries);
                        retries += 1;
                        tracing::debug!(%key, error = %err, retry = retries, ?delay, "read failed; retrying");
                        tokio::time::sleep(delay).await;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Run a write and, on success, invalidate every key under `invalidates`.
    ///
    /// Writes are never retried.
    ///
    /// # Errors
    ///
    /// Returns the mutation's error unchanged; nothing is invalidated then.
    pub async fn mutate<T, Fut>(&self, mutation: Fut, invalidates: &[QueryKey]) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let value = mutation.await?;
        for prefix in invalidates {
            self.invalidate(prefix);
        }
        Ok(value)
    }

    /// Mark every entry under `prefix` stale and detach running fetches for it.
    pub fn invalidate(&self, prefix: &QueryKey) {
        let mut state = self.lock();
        let mut marked = 0_usize;
        for (key, entry) in &mut state.entries {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                marked += 1;
            }
        }
        state.in_flight.retain(|key, _| !key.starts_with(prefix));
        tracing::debug!(%prefix, marked, "cache invalidated");
    }

    /// Drop every entry and detach every running fetch.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.in_flight.clear();
        tracing::debug!("cache cleared");
    }

    /// Cached data for `key` regardless of staleness.
    #[must_use]
    pub fn peek<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let state = self.lock();
        state.entries.get(key).and_then(|entry| serde_json::from_value(entry.data.clone()).ok())
    }

    /// Whether `key` has an entry that a read with `stale_time` would serve.
    #[must_use]
    pub fn is_fresh(&self, key: &QueryKey, stale_time: Duration) -> bool {
        self.lock().entries.get(key).is_some_and(|entry| entry.is_fresh(Instant::now(), stale_time))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries not read within the gc time, measured from `now`.
    pub fn collect_garbage_at(&self, now: Instant) {
        self.lock().collect_garbage(now, self.config.gc_time);
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn decode<T: DeserializeOwned>(data: &Value) -> Result<T, ApiError> {
    serde_json::from_value(data.clone()).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
