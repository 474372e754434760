use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::identity::UserHandle;

/// Request header carrying the opaque session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Idle period after which an untouched session is dropped.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Only well-formed UUIDs are accepted as store keys.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim())
            .ok()
            .map(|uuid| Self(uuid.to_string()))
    }

    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(Self::parse)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user: UserHandle,
    /// Normalized (trimmed, lowercased) login email.
    pub email: String,
}

/// Per-user authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    LoggedOut,
    LoggedIn(AuthenticatedUser),
}

impl Session {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            Session::LoggedIn(user) => Some(user),
            Session::LoggedOut => None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.user().is_some()
    }
}

/// Keeps sessions between requests.
pub trait SessionStore: Send + Sync {
    /// Unknown ids load as `LoggedOut`.
    fn load(&self, id: &SessionId) -> Session;
    fn save(&self, id: SessionId, session: Session);
}

#[derive(Debug, Clone)]
struct StoredSession {
    session: Session,
    last_seen: DateTime<Utc>,
}

/// In-process store with a sliding idle timeout. Expired entries are
/// evicted on every access and load as `LoggedOut`.
#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, StoredSession>>>,
    idle_timeout: Duration,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_SESSION_IDLE_TIMEOUT)
    }
}

impl MemorySessionStore {
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &StoredSession, now: DateTime<Utc>) -> bool {
        // Clock skew backwards yields a negative delta, which never expires.
        (now - entry.last_seen)
            .to_std()
            .is_ok_and(|idle| idle > self.idle_timeout)
    }

    fn evict_expired(
        &self,
        sessions: &mut HashMap<SessionId, StoredSession>,
        now: DateTime<Utc>,
    ) {
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, "expired sessions dropped");
        }
    }

    pub(crate) fn load_at(&self, id: &SessionId, now: DateTime<Utc>) -> Session {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        self.evict_expired(&mut guard, now);
        match guard.get_mut(id) {
            Some(entry) => {
                entry.last_seen = now;
                entry.session.clone()
            }
            None => Session::LoggedOut,
        }
    }

    pub(crate) fn save_at(&self, id: SessionId, session: Session, now: DateTime<Utc>) {
        let mut guard = self.sessions.lock().expect("session mutex poisoned");
        self.evict_expired(&mut guard, now);
        match session {
            Session::LoggedOut => {
                guard.remove(&id);
            }
            logged_in => {
                guard.insert(
                    id,
                    StoredSession {
                        session: logged_in,
                        last_seen: now,
                    },
                );
            }
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, id: &SessionId) -> Session {
        self.load_at(id, Utc::now())
    }

    fn save(&self, id: SessionId, session: Session) {
        self.save_at(id, session, Utc::now())
    }
}
