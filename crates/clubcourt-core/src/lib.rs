pub mod error;
pub mod finalize;
pub mod lifecycle;
pub mod negotiation;
pub mod protocol;
pub mod score;
pub mod session;
pub mod side;

pub use error::{Error, Result};
pub use finalize::{finalize, FinalScore, SetResult};
pub use lifecycle::{Match, MatchAction, MatchStatus, ReportedScore};
pub use negotiation::{Logistics, MatchLogistics, Negotiation, Offer, Proposal, SplitPolicy};
pub use score::{
    apply_event, apply_game_result, apply_point, apply_tiebreak_result, ScoreState, ScoreUpdate,
    ScoringEvent, ScoringMode,
};
pub use session::{FileSessionStore, MemorySessionStore, Scorekeeper, ScoringSession, SessionStore};
pub use side::Side;
