//! Per-session token storage.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::token::AntiForgeryToken;

/// Identifier carried in the session cookie.
pub type SessionId = String;

/// Idle time after which a session is forgotten.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug, Clone)]
struct SessionEntry {
    token: AntiForgeryToken,
    last_seen: Instant,
}

/// Thread-safe map from session id to its anti-forgery token.
///
/// Ids are only ever minted by [`SessionStore::create`]; an id the store
/// has not issued is never looked up into existence. Sessions idle for
/// longer than the TTL expire, and once the store is full the least
/// recently seen session is evicted to make room.
#[derive(Debug)]
pub struct SessionStore {
    entries: DashMap<SessionId, SessionEntry>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with an idle TTL and a capacity (at least one).
    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Start a new session with a fresh id and token.
    pub fn create(&self) -> (SessionId, AntiForgeryToken) {
        if self.entries.len() >= self.max_sessions {
            self.prune();
        }
        while self.entries.len() >= self.max_sessions {
            if !self.evict_oldest() {
                break;
            }
        }

        let session_id = Uuid::new_v4().to_string();
        let token = AntiForgeryToken::generate();
        self.entries.insert(
            session_id.clone(),
            SessionEntry {
                token: token.clone(),
                last_seen: Instant::now(),
            },
        );
        debug!(session_id = %session_id, "Issued anti-forgery token");
        (session_id, token)
    }

    /// Token for a live session, refreshing its last-seen time.
    ///
    /// Unknown and expired ids yield `None`.
    pub fn get(&self, session_id: &str) -> Option<AntiForgeryToken> {
        match self.entries.get_mut(session_id) {
            Some(mut entry) if entry.last_seen.elapsed() < self.ttl => {
                entry.last_seen = Instant::now();
                return Some(entry.token.clone());
            }
            Some(_) => {}
            None => return None,
        }

        let ttl = self.ttl;
        if self
            .entries
            .remove_if(session_id, |_, entry| entry.last_seen.elapsed() >= ttl)
            .is_some()
        {
            debug!(session_id, "Session expired");
        }
        None
    }

    /// Drop expired sessions and return how many were removed.
    pub fn prune(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.last_seen.elapsed() < ttl);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Pruned expired sessions");
        }
        removed
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.last_seen)
            .map(|entry| entry.key().clone());
        match oldest {
            Some(session_id) => {
                debug!(session_id = %session_id, "Evicting least recently seen session");
                self.entries.remove(&session_id).is_some()
            }
            None => false,
        }
    }

    /// Prune on a fixed interval until `shutdown` is cancelled.
    pub fn start_cleanup_task(self: &Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        store.prune();
                    }
                }
            }
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
