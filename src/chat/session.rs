use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::conversation_state::ConversationState;

pub type SessionId = Uuid;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Bumped on every reset, so a reply computed for an older transcript is
/// never recorded into a newer one.
pub type Generation = u64;

struct Session {
    conversation: ConversationState,
    generation: Generation,
    last_seen: Instant,
}

impl Session {
    fn new(generation: Generation) -> Self {
        Self {
            conversation: ConversationState::new(),
            generation,
            last_seen: Instant::now(),
        }
    }
}

/// Conversation states keyed by session id, one per browser.
///
/// Sessions idle for longer than `ttl` are dropped, and the least recently
/// used one is evicted when `max_sessions` would be exceeded.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
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

    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Reset `existing` if it is a known session, otherwise open a new one.
    pub async fn start(&self, existing: Option<SessionId>) -> SessionId {
        let mut sessions = self.sessions.lock().await;
        self.sweep(&mut sessions);

        if let Some(id) = existing {
            if let Some(session) = sessions.get_mut(&id) {
                *session = Session::new(session.generation + 1);
                return id;
            }
        }
        self.open(&mut sessions)
    }

    /// Keep a known session, or open a new one for an unknown or absent id.
    pub async fn resolve(&self, candidate: Option<SessionId>) -> SessionId {
        let mut sessions = self.sessions.lock().await;
        self.sweep(&mut sessions);

        match candidate {
            Some(id) if sessions.contains_key(&id) => id,
            _ => self.open(&mut sessions),
        }
    }

    /// Run `f` on the session's transcript, opening it if it was swept away.
    pub async fn with_conversation<R>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut ConversationState) -> R,
    ) -> (Generation, R) {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.entry(id).or_insert_with(|| Session::new(0));
        session.last_seen = Instant::now();
        (session.generation, f(&mut session.conversation))
    }

    /// Run `f` only if the session still exists and has not been reset since
    /// `generation` was handed out.
    pub async fn with_current<R>(
        &self,
        id: SessionId,
        generation: Generation,
        f: impl FnOnce(&mut ConversationState) -> R,
    ) -> Option<R> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(&id)
            .filter(|session| session.generation == generation)?;
        session.last_seen = Instant::now();
        Some(f(&mut session.conversation))
    }

    fn open(&self, sessions: &mut HashMap<SessionId, Session>) -> SessionId {
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, session)| session.last_seen)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    debug!(session = %id, "Evicting least recently used session");
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        let id = Uuid::new_v4();
        sessions.insert(id, Session::new(0));
        id
    }

    fn sweep(&self, sessions: &mut HashMap<SessionId, Session>) {
        let now = Instant::now();
        sessions.retain(|id, session| {
            let alive = now.duration_since(session.last_seen) <= self.ttl;
            if !alive {
                debug!(session = %id, "Dropping idle session");
            }
            alive
        });
    }

    #[cfg(test)]
    pub(crate) async fn snapshot(&self, id: SessionId) -> Option<ConversationState> {
        self.sessions
            .lock()
            .await
            .get(&id)
            .map(|session| session.conversation.clone())
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
