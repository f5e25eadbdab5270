use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use pki_types::UnixTime;

#[cfg(feature = "logging")]
use crate::log::{debug, warn};
use crate::msgs::handshake::SessionId;
use crate::session::Session;
use crate::time_provider::{DefaultTimeProvider, TimeProvider};

/// Default session lifetime, matching common server defaults.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(5 * 60 * 60);

/// Default number of sessions kept.
pub const DEFAULT_CAPACITY: usize = 256;

/// A thread-safe store of resumable sessions, keyed by session id.
///
/// Lookups take a read lock, so concurrent connections resuming from the
/// same cache do not serialise on each other.  Stored sessions are shared
/// by `Arc` and never change, except for becoming not resumable.
#[derive(Debug)]
pub struct SessionCache {
    inner: RwLock<Inner>,
    capacity: usize,
    timeout: Duration,
    time_provider: Arc<dyn TimeProvider>,
}

#[derive(Debug, Default)]
struct Inner {
    map: HashMap<SessionId, Arc<Session>>,
    // insertion order, oldest first
    order: VecDeque<SessionId>,
}

impl SessionCache {
    /// Make a cache holding up to `capacity` sessions, each usable for
    /// `timeout` after creation.
    pub fn new(capacity: usize, timeout: Duration) -> Self {
        Self::with_time_provider(capacity, timeout, Arc::new(DefaultTimeProvider))
    }

    /// As [`SessionCache::new`], reading the time from `time_provider`.
    pub fn with_time_provider(
        capacity: usize,
        timeout: Duration,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            capacity: capacity.max(1),
            timeout,
            time_provider,
        }
    }

    /// The lifetime sessions are given.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Find a resumable, unexpired session with exactly this id.
    ///
    /// If the clock cannot be read every session counts as expired.
    pub fn find(&self, id: &SessionId) -> Option<Arc<Session>> {
        if id.is_empty() {
            return None;
        }

        let Some(now) = self.time_provider.current_time() else {
            warn!("clock unavailable; not resuming {:?}", id);
            return None;
        };

        let inner = self.read();
        let session = inner.map.get(id)?;
        if !session.is_resumable() || session.has_expired(now, self.timeout) {
            return None;
        }
        Some(Arc::clone(session))
    }

    /// Store `session` under its id.  A session already stored under the
    /// same id is replaced.  When full, the oldest insertion is evicted.
    pub fn insert(&self, session: Arc<Session>) {
        let id = *session.id();
        if id.is_empty() {
            return;
        }

        let mut inner = self.write();
        if inner
            .map
            .insert(id, session)
            .is_some()
        {
            warn!("replacing cached session {:?}", id);
            inner.order.retain(|k| *k != id);
        }
        inner.order.push_back(id);

        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                debug!("evicting cached session {:?}", oldest);
                inner.map.remove(&oldest);
            }
        }
    }

    /// Mark the session stored under `id` not resumable.
    ///
    /// Connections already holding the session see the change too.
    /// Idempotent; unknown ids are ignored.
    pub fn invalidate(&self, id: &SessionId) {
        if let Some(session) = self.read().map.get(id) {
            session.mark_not_resumable();
        }
    }

    /// Drop every session expired at `now`, and every invalidated one.
    pub fn flush_expired(&self, now: UnixTime) {
        let timeout = self.timeout;
        let mut inner = self.write();
        let Inner { map, order } = &mut *inner;
        map.retain(|_, s| s.is_resumable() && !s.has_expired(now, timeout));
        order.retain(|id| map.contains_key(id));
    }

    /// Number of sessions stored, including any not yet flushed.
    pub fn len(&self) -> usize {
        self.read().map.len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // `Inner` stays usable after a panic under the lock: at worst `order`
    // names an id that `map` no longer holds.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| {
            warn!("session cache lock poisoned");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| {
            warn!("session cache lock poisoned");
            poisoned.into_inner()
        })
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_SESSION_TIMEOUT)
    }
}
