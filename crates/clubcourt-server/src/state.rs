use std::io;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use sqlx::SqlitePool;

use clubcourt_core::{ScoringSession, SessionStore};

/// A hosted scoring session and when it last changed.
#[derive(Debug, Clone)]
pub struct LiveSession {
    pub session: ScoringSession,
    pub last_activity: Instant,
}

/// Live scoring sessions keyed by session code.
#[derive(Debug, Default)]
pub struct LiveSessions {
    sessions: DashMap<String, LiveSession>,
}

impl LiveSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.sessions.contains_key(code)
    }

    /// Change a session in place while holding its map entry, so writers
    /// to one code are serialized. `None` if the code is unknown.
    pub fn update<R>(&self, code: &str, f: impl FnOnce(&mut ScoringSession) -> R) -> Option<R> {
        let mut live = self.sessions.get_mut(code)?;
        live.last_activity = Instant::now();
        Some(f(&mut live.session))
    }

    /// Remove a session so it can be finished. Later events see it gone.
    pub fn take(&self, code: &str) -> Option<ScoringSession> {
        self.sessions.remove(code).map(|(_, live)| live.session)
    }

    /// Put back a session whose finish was refused.
    pub fn restore(&self, session: ScoringSession) {
        self.sessions
            .entry(session.code.clone())
            .or_insert_with(|| LiveSession {
                session,
                last_activity: Instant::now(),
            });
    }

    /// Remove sessions untouched for longer than `max_idle`. Returns the
    /// codes removed.
    pub fn evict_idle(&self, max_idle: Duration) -> Vec<String> {
        let now = Instant::now();
        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| now.duration_since(entry.value().last_activity) > max_idle)
            .map(|entry| entry.key().clone())
            .collect();
        for code in &stale {
            self.sessions.remove(code);
        }
        stale
    }
}

impl SessionStore for LiveSessions {
    fn get(&self, code: &str) -> io::Result<Option<ScoringSession>> {
        Ok(self.sessions.get(code).map(|live| live.session.clone()))
    }

    fn put(&self, session: &ScoringSession) -> io::Result<()> {
        self.sessions.insert(
            session.code.clone(),
            LiveSession {
                session: session.clone(),
                last_activity: Instant::now(),
            },
        );
        Ok(())
    }

    fn clear(&self, code: &str) -> io::Result<()> {
        self.sessions.remove(code);
        Ok(())
    }
}

/// Shared application state.
pub struct AppState {
    pub db: SqlitePool,
    pub sessions: LiveSessions,
    pub max_sessions: usize,
}

impl AppState {
    pub fn new(db: SqlitePool, max_sessions: usize) -> Self {
        Self {
            db,
            sessions: LiveSessions::new(),
            max_sessions,
        }
    }
}
