//! Session collaborator.
//!
//! The routing core only needs `has`/`get`/`set` on a session: the auth
//! middleware checks login state, the role middlewares read the role, and the
//! intended post-login destination is written back. Storage is pluggable via
//! [`SessionStore`]; [`MemorySessionStore`] keeps everything in-process.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use crate::ids::RequestId;

/// Per-request view of a user's session.
pub trait Session: Send + Debug {
    /// Identifier of a persisted session, `None` for a fresh one.
    fn id(&self) -> Option<&str>;

    fn get(&self, key: &str) -> Option<&Value>;

    fn set(&mut self, key: &str, value: Value);

    fn remove(&mut self, key: &str) -> Option<Value>;

    /// Whether `set`/`remove` has been called since the session was loaded.
    fn is_modified(&self) -> bool;

    /// Copy of every stored entry, used by stores when persisting.
    fn snapshot(&self) -> HashMap<String, Value>;

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

/// Plain in-memory session.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    id: Option<String>,
    values: HashMap<String, Value>,
    modified: bool,
}

impl MemorySession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(id: impl Into<String>, values: HashMap<String, Value>) -> Self {
        Self {
            id: Some(id.into()),
            values,
            modified: false,
        }
    }

    /// Builder-style insert, mostly useful in tests.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }
}

impl Session for MemorySession {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
        self.modified = true;
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        let old = self.values.remove(key);
        if old.is_some() {
            self.modified = true;
        }
        old
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn snapshot(&self) -> HashMap<String, Value> {
        self.values.clone()
    }
}

/// Loads and persists sessions between requests.
pub trait SessionStore: Send + Sync {
    /// Load the session for `id`, or a fresh one when unknown.
    fn load(&self, id: Option<&str>) -> Box<dyn Session>;

    /// Persist a modified session. Returns the id of a newly created session
    /// so the caller can hand it to the client.
    fn save(&self, session: &dyn Session) -> Option<String>;
}

/// Idle timeout of [`MemorySessionStore::new`].
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Expired sessions are swept once every this many created sessions.
const PURGE_EVERY: u64 = 1024;

#[derive(Debug, Clone)]
struct StoredSession {
    values: HashMap<String, Value>,
    last_seen: Instant,
}

/// Session store backed by a concurrent map.
///
/// A session not loaded or saved within the idle timeout is treated as
/// unknown and removed. Expired entries are also swept periodically as new
/// sessions are created, so abandoned anonymous sessions do not accumulate.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: DashMap<String, StoredSession>,
    idle_timeout: Duration,
    created: AtomicU64,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }

    #[must_use]
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
            created: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn expired(&self, stored: &StoredSession, now: Instant) -> bool {
        now.saturating_duration_since(stored.last_seen) >= self.idle_timeout
    }

    /// Drop sessions idle for longer than the timeout at `now`.
    pub fn purge_expired(&self, now: Instant) {
        let before = self.sessions.len();
        self.sessions.retain(|_, stored| !self.expired(stored, now));
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            debug!(purged, remaining = self.sessions.len(), "Expired sessions purged");
        }
    }

    fn load_at(&self, id: Option<&str>, now: Instant) -> Box<dyn Session> {
        let Some(id) = id else {
            return Box::new(MemorySession::new());
        };
        let values = match self.sessions.get_mut(id) {
            Some(mut stored) if !self.expired(&stored, now) => {
                stored.last_seen = now;
                Some(stored.values.clone())
            }
            _ => None,
        };
        match values {
            Some(values) => Box::new(MemorySession::with_id(id, values)),
            None => {
                self.sessions.remove_if(id, |_, stored| self.expired(stored, now));
                Box::new(MemorySession::new())
            }
        }
    }

    fn save_at(&self, session: &dyn Session, now: Instant) -> Option<String> {
        if !session.is_modified() {
            return None;
        }
        let stored = StoredSession {
            values: session.snapshot(),
            last_seen: now,
        };
        match session.id() {
            Some(id) => {
                self.sessions.insert(id.to_string(), stored);
                None
            }
            None => {
                let created = self.created.fetch_add(1, Ordering::Relaxed) + 1;
                if created % PURGE_EVERY == 0 {
                    self.purge_expired(now);
                }
                let id = RequestId::new().to_string();
                debug!(session_id = %id, "Session created");
                self.sessions.insert(id.clone(), stored);
                Some(id)
            }
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, id: Option<&str>) -> Box<dyn Session> {
        self.load_at(id, Instant::now())
    }

    fn save(&self, session: &dyn Session) -> Option<String> {
        self.save_at(session, Instant::now())
    }
}
