//! # TTL Cache
//! Keeps the last fetched [`Feed`] per `(provider, category)` until the
//! feed's own TTL elapses.
//!
//! Expiry is driven by a single background sweeper over a min-heap of
//! deadlines, not by reads. Every `store` bumps a generation counter for
//! its key; the sweeper only evicts an entry whose generation matches the
//! scheduled expiry, so an overwritten entry keeps its own full TTL.
//! `get` additionally hides entries whose deadline has passed but which
//! the sweeper has not reached yet.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::clock::Clock;
use crate::news::{Category, Feed, NewsError, NewsResult, ProviderId};

/// Read/write seam used by the aggregation service.
#[cfg_attr(test, mockall::automock)]
pub trait FeedCache: Send + Sync {
    /// Stored feed for the pair, if still fresh. Never blocks on I/O.
    fn get(&self, provider: &ProviderId, category: &Category) -> Option<Feed>;

    /// Insert or overwrite, and schedule removal after `feed.ttl` minutes.
    fn store(&self, provider: &ProviderId, category: &Category, feed: Feed);
}

/// Composite lookup key; distinct pairs never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub provider: ProviderId,
    pub category: Category,
}

impl CacheKey {
    pub fn new(provider: &ProviderId, category: &Category) -> Self {
        Self {
            provider: provider.clone(),
            category: category.clone(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.provider, self.category)
    }
}

#[derive(Debug)]
struct Entry {
    feed: Feed,
    deadline: Instant,
    generation: u64,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Expiry {
    deadline: Instant,
    generation: u64,
    key: CacheKey,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<CacheKey, Entry>,
    expiries: BinaryHeap<Reverse<Expiry>>,
    next_generation: u64,
}

struct Inner {
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every due entry; return the next pending deadline, if any.
    fn purge_expired(&self) -> Option<Instant> {
        let now = self.clock.now();
        let mut state = self.lock();
        loop {
            let deadline = match state.expiries.peek() {
                Some(Reverse(exp)) => exp.deadline,
                None => return None,
            };
            if deadline > now {
                return Some(deadline);
            }
            let Some(Reverse(exp)) = state.expiries.pop() else {
                return None;
            };
            let current = state
                .entries
                .get(&exp.key)
                .is_some_and(|e| e.generation == exp.generation);
            if current {
                state.entries.remove(&exp.key);
                debug!(target: "cache", key = %exp.key, "feed expired");
            }
        }
    }
}

/// In-memory TTL cache. Requires a Tokio runtime for its sweeper task.
pub struct TtlCache {
    inner: Arc<Inner>,
    wake: Arc<Notify>,
    sweeper: JoinHandle<()>,
}

#[derive(Default)]
pub struct TtlCacheBuilder {
    clock: Option<Arc<dyn Clock>>,
}

impl TtlCacheBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Fails with `invalid parameter: clock` when no clock was supplied,
    /// and with `invalid parameter: runtime` outside a Tokio runtime.
    pub fn build(self) -> NewsResult<TtlCache> {
        let clock = self.clock.ok_or_else(|| NewsError::invalid("clock"))?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| NewsError::invalid("runtime"))?;

        let inner = Arc::new(Inner {
            clock: clock.clone(),
            state: Mutex::new(State::default()),
        });
        let wake = Arc::new(Notify::new());

        let sweeper = runtime.spawn(sweep(Arc::downgrade(&inner), wake.clone(), clock));

        Ok(TtlCache {
            inner,
            wake,
            sweeper,
        })
    }
}

impl TtlCache {
    pub fn builder() -> TtlCacheBuilder {
        TtlCacheBuilder::default()
    }

    /// Number of entries currently held, including due-but-unswept ones.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FeedCache for TtlCache {
    fn get(&self, provider: &ProviderId, category: &Category) -> Option<Feed> {
        let key = CacheKey::new(provider, category);
        let now = self.inner.clock.now();
        let state = self.inner.lock();
        state
            .entries
            .get(&key)
            .filter(|e| now < e.deadline)
            .map(|e| e.feed.clone())
    }

    fn store(&self, provider: &ProviderId, category: &Category, feed: Feed) {
        let key = CacheKey::new(provider, category);
        let ttl = Duration::from_secs(u64::from(feed.ttl) * 60);
        let deadline = self.inner.clock.now() + ttl;

        {
            let mut state = self.inner.lock();
            let generation = state.next_generation;
            state.next_generation += 1;
            state.expiries.push(Reverse(Expiry {
                deadline,
                generation,
                key: key.clone(),
            }));
            state.entries.insert(
                key.clone(),
                Entry {
                    feed,
                    deadline,
                    generation,
                },
            );
        }

        debug!(target: "cache", %key, ttl_mins = ttl.as_secs() / 60, "feed stored");
        self.wake.notify_one();
    }
}

impl Drop for TtlCache {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

async fn sweep(inner: Weak<Inner>, wake: Arc<Notify>, clock: Arc<dyn Clock>) {
    loop {
        let next = match inner.upgrade() {
            Some(inner) => inner.purge_expired(),
            None => return,
        };
        match next {
            Some(deadline) => {
                let delay = deadline.saturating_duration_since(clock.now());
                tokio::select! {
                    _ = clock.after(delay) => {}
                    _ = wake.notified() => {}
                }
            }
            None => wake.notified().await,
        }
    }
}
