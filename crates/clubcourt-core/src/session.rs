use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::finalize::{finalize, FinalScore};
use crate::score::{apply_event, ScoreState, ScoreUpdate, ScoringEvent};
use crate::side::Side;

/// A live scoring session on one device, with a linear undo history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringSession {
    pub code: String,
    /// The pairing this session is scoring, if any (friendlies have none).
    pub match_id: Option<i64>,
    pub state: ScoreState,
    /// Prior states, most recent last.
    pub history: Vec<ScoreState>,
}

impl ScoringSession {
    pub fn new(code: String, match_id: Option<i64>, state: ScoreState) -> Self {
        Self {
            code,
            match_id,
            state,
            history: Vec::new(),
        }
    }

    /// Apply an event. Events that leave the state unchanged (a finished
    /// match, a tiebreak shortcut outside a tiebreak) are not recorded.
    pub fn record(&mut self, event: ScoringEvent) -> ScoreUpdate {
        let update = apply_event(&self.state, event);
        if update.state != self.state {
            let prior = std::mem::replace(&mut self.state, update.state.clone());
            self.history.push(prior);
        }
        update
    }

    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(prior) => {
                self.state = prior;
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_match_complete()
    }

    pub fn finish(&self, winner_override: Option<Side>) -> Result<FinalScore> {
        finalize(&self.state, winner_override)
    }
}

/// Generate a random 6-character uppercase alphanumeric session code.
pub fn generate_session_code() -> String {
    use rand::RngExt;
    let mut rng = rand::rng();
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    (0..6)
        .map(|_| {
            let idx = rng.random_range(0..CHARS.len());
            CHARS[idx] as char
        })
        .collect()
}

/// Where session snapshots live between events.
pub trait SessionStore {
    fn get(&self, code: &str) -> io::Result<Option<ScoringSession>>;
    fn put(&self, session: &ScoringSession) -> io::Result<()>;
    fn clear(&self, code: &str) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, ScoringSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<String, ScoringSession>>> {
        self.sessions
            .lock()
            .map_err(|_| io::Error::other("session store poisoned"))
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, code: &str) -> io::Result<Option<ScoringSession>> {
        Ok(self.lock()?.get(code).cloned())
    }

    fn put(&self, session: &ScoringSession) -> io::Result<()> {
        self.lock()?.insert(session.code.clone(), session.clone());
        Ok(())
    }

    fn clear(&self, code: &str) -> io::Result<()> {
        self.lock()?.remove(code);
        Ok(())
    }
}

/// One JSON file per session under a root directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    /// Store under the user's data directory (`<data>/clubcourt/sessions`).
    pub fn new() -> Self {
        let root = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clubcourt")
            .join("sessions");
        Self::with_root(root)
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, code: &str) -> io::Result<PathBuf> {
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid session code {code:?}"),
            ));
        }
        Ok(self.root.join(format!("{code}.json")))
    }
}

impl Default for FileSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, code: &str) -> io::Result<Option<ScoringSession>> {
        let path = self.path_for(code)?;
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let session = serde_json::from_str(&data).map_err(io::Error::other)?;
        Ok(Some(session))
    }

    fn put(&self, session: &ScoringSession) -> io::Result<()> {
        let path = self.path_for(&session.code)?;
        std::fs::create_dir_all(&self.root)?;
        let json = serde_json::to_string(session).map_err(io::Error::other)?;
        std::fs::write(path, json)
    }

    fn clear(&self, code: &str) -> io::Result<()> {
        match std::fs::remove_file(self.path_for(code)?) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Drives a session and snapshots it to a store after every change.
/// Snapshots are best-effort: a failed write is logged and scoring
/// carries on. One keeper per session; two keepers resumed from the same
/// snapshot overwrite each other.
pub struct Scorekeeper<'a, S: SessionStore> {
    store: &'a S,
    session: ScoringSession,
}

impl<'a, S: SessionStore> Scorekeeper<'a, S> {
    pub fn start(store: &'a S, session: ScoringSession) -> Self {
        let keeper = Self { store, session };
        keeper.snapshot();
        keeper
    }

    /// Pick up a session from its last snapshot.
    pub fn resume(store: &'a S, code: &str) -> io::Result<Option<Self>> {
        Ok(store.get(code)?.map(|session| Self { store, session }))
    }

    pub fn session(&self) -> &ScoringSession {
        &self.session
    }

    pub fn record(&mut self, event: ScoringEvent) -> ScoreUpdate {
        let update = self.session.record(event);
        debug!(code = %self.session.code, ?event, match_completed = update.match_completed, "recorded");
        self.snapshot();
        update
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.session.undo();
        if undone {
            self.snapshot();
        }
        undone
    }

    pub fn finish(&self, winner_override: Option<Side>) -> Result<FinalScore> {
        self.session.finish(winner_override)
    }

    /// Drop the session and its snapshot.
    pub fn discard(self) {
        if let Err(e) = self.store.clear(&self.session.code) {
            warn!(code = %self.session.code, error = %e, "failed to clear session snapshot");
        }
    }

    fn snapshot(&self) {
        if let Err(e) = self.store.put(&self.session) {
            warn!(code = %self.session.code, error = %e, "failed to snapshot session");
        }
    }
}
