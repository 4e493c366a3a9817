//! Shared gateway state: the counseling service and the in-memory session registry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use fateful_book_core::{ConversationSession, CounselingService, Phase, TurnLimits};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_FINISHED_TTL: Duration = Duration::from_secs(5 * 60);

/// Each session sits behind its own async mutex, so turns on one session are serialized
/// while different sessions proceed independently.
pub type SharedSession = Arc<Mutex<ConversationSession>>;

/// How long untouched sessions are kept. Finished sessions only wait for a shadow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTtl {
    pub idle: Duration,
    pub finished: Duration,
}

impl Default for SessionTtl {
    fn default() -> Self {
        Self {
            idle: DEFAULT_IDLE_TTL,
            finished: DEFAULT_FINISHED_TTL,
        }
    }
}

struct Entry {
    session: SharedSession,
    touched: Instant,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, Entry>,
    ttl: SessionTtl,
}

impl SessionRegistry {
    pub fn new(ttl: SessionTtl) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn insert(&self, session: ConversationSession) -> Uuid {
        let id = Uuid::new_v4();
        let entry = Entry {
            session: Arc::new(Mutex::new(session)),
            touched: Instant::now(),
        };
        self.sessions.insert(id, entry);
        id
    }

    /// Cloned handle; refreshes the last-touched time. No shard lock outlives this call.
    pub fn get(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.get_mut(id).map(|mut entry| {
            entry.touched = Instant::now();
            Arc::clone(&entry.session)
        })
    }

    pub fn remove(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.remove(id).map(|(_, entry)| entry.session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Drops sessions untouched for longer than their TTL as of `now`. Sessions with a
    /// request in flight are kept. Returns how many were evicted.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| {
            let Ok(session) = entry.session.try_lock() else {
                return true;
            };
            let ttl = if session.phase() == Phase::Done {
                self.ttl.finished
            } else {
                self.ttl.idle
            };
            now.saturating_duration_since(entry.touched) <= ttl
        });
        before.saturating_sub(self.sessions.len())
    }
}

/// Periodic eviction for the lifetime of the gateway.
pub fn spawn_sweeper(state: Arc<AppState>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let evicted = state.sessions.sweep(Instant::now());
            if evicted > 0 {
                tracing::info!("[SYSTEM] Evicted {} idle sessions ({} active)", evicted, state.sessions.len());
            }
        }
    })
}

pub struct AppState {
    pub counsel: CounselingService,
    pub sessions: SessionRegistry,
    pub limits: TurnLimits,
}

impl AppState {
    pub fn new(counsel: CounselingService, limits: TurnLimits) -> Self {
        Self::with_ttl(counsel, limits, SessionTtl::default())
    }

    pub fn with_ttl(counsel: CounselingService, limits: TurnLimits, ttl: SessionTtl) -> Self {
        Self {
            counsel,
            sessions: SessionRegistry::new(ttl),
            limits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(SessionTtl {
            idle: Duration::from_secs(60),
            finished: Duration::from_secs(10),
        })
    }

    fn finished_session() -> ConversationSession {
        let mut session = ConversationSession::new("INFP", TurnLimits { min_turns: 1, max_turns: 1 });
        session.begin_turn("hello").unwrap();
        session.complete_turn("I see.".to_string()).unwrap();
        session.attach_prescription(fateful_book_core::Prescription::fallback()).unwrap();
        session
    }

    #[test]
    fn remove_forgets_the_session() {
        let sessions = registry();
        let id = sessions.insert(ConversationSession::new("INFP", TurnLimits::default()));
        assert!(sessions.remove(&id).is_some());
        assert!(sessions.get(&id).is_none());
        assert!(sessions.remove(&id).is_none());
        assert_eq!(sessions.len(), 0);
    }

    #[test]
    fn sweep_evicts_by_idle_time() {
        let sessions = registry();
        let id = sessions.insert(ConversationSession::new("INFP", TurnLimits::default()));
        let now = Instant::now();

        assert_eq!(sessions.sweep(now + Duration::from_secs(30)), 0);
        assert_eq!(sessions.sweep(now + Duration::from_secs(120)), 1);
        assert!(sessions.get(&id).is_none());
    }

    #[test]
    fn finished_sessions_expire_sooner() {
        let sessions = registry();
        let done = sessions.insert(finished_session());
        let open = sessions.insert(ConversationSession::new("ENTJ", TurnLimits::default()));

        assert_eq!(sessions.sweep(Instant::now() + Duration::from_secs(30)), 1);
        assert!(sessions.get(&done).is_none());
        assert!(sessions.get(&open).is_some());
    }

    #[tokio::test]
    async fn busy_sessions_survive_the_sweep() {
        let sessions = registry();
        let id = sessions.insert(ConversationSession::new("INFP", TurnLimits::default()));
        let handle = sessions.get(&id).unwrap();
        let _guard = handle.lock().await;

        assert_eq!(sessions.sweep(Instant::now() + Duration::from_secs(600)), 0);
        assert_eq!(sessions.len(), 1);
    }
}
