use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use shared::{
    domain::{RequestKind, SessionId},
    error::SubmitRejection,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    render::Event,
    store::{Page, SessionStore, SheetUrl, SubmitLock},
};

pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(3600);
const MIN_SESSION_IDLE: Duration = Duration::from_secs(1);

/// One browser session. Holding `store` serializes render passes for the session.
#[derive(Debug)]
pub struct SessionHandle {
    pub id: SessionId,
    pub store: Mutex<SessionStore>,
    submit_lock: Arc<SubmitLock>,
}

impl SessionHandle {
    pub fn new(id: SessionId, store: SessionStore) -> Self {
        Self {
            id,
            submit_lock: store.submit_lock(),
            store: Mutex::new(store),
        }
    }

    /// Kind holding the submit lock right now, without waiting for a running pass.
    pub fn locked_by(&self) -> Option<RequestKind> {
        self.submit_lock.holder()
    }

    /// Judges a submission against the lock at arrival, before waiting for a
    /// running pass to release the store.
    pub fn admit(&self, event: Event) -> Event {
        let is_submission = matches!(event, Event::SubmitChat { .. } | Event::SubmitImage { .. });
        match self.locked_by() {
            Some(pending) if is_submission => {
                debug!(session_id = %self.id, pending = pending.label(), "submission arrived while locked");
                Event::Rejected(SubmitRejection::Locked { pending })
            }
            _ => event,
        }
    }
}

struct SessionEntry {
    handle: Arc<SessionHandle>,
    last_seen: Instant,
}

pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
    idle_timeout: Duration,
    default_sheet_url: String,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration, default_sheet_url: impl Into<String>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout: idle_timeout.max(MIN_SESSION_IDLE),
            default_sheet_url: default_sheet_url.into(),
        }
    }

    /// Returns the live session for `id`, or a fresh one when `id` is absent,
    /// unknown or expired. The flag reports whether a session was created.
    pub async fn resolve(&self, id: Option<SessionId>, now: Instant) -> (Arc<SessionHandle>, bool) {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_seen) < self.idle_timeout);
        if sessions.len() != before {
            debug!(evicted = before - sessions.len(), "evicted idle sessions");
        }

        if let Some(entry) = id.and_then(|id| sessions.get_mut(&id)) {
            entry.last_seen = now;
            return (entry.handle.clone(), false);
        }

        let id = SessionId::new_random();
        let handle = Arc::new(SessionHandle::new(id, self.seed_store()));
        sessions.insert(
            id,
            SessionEntry {
                handle: handle.clone(),
                last_seen: now,
            },
        );
        info!(session_id = %id, "created session");
        (handle, true)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn seed_store(&self) -> SessionStore {
        let mut store = SessionStore::new();
        store.set::<SheetUrl>(self.default_sheet_url.clone());
        store.set::<Page>(1);
        store
    }
}
