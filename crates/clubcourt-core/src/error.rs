use thiserror::Error;

use crate::lifecycle::{MatchAction, MatchStatus};

/// Recoverable errors raised by scoring and match lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("unrecognized side: {0:?}")]
    InvalidSide(String),

    #[error("cannot {action} a match that is {from}")]
    InvalidTransition { from: MatchStatus, action: MatchAction },

    #[error("it is not your turn to act on this proposal")]
    NotYourTurn,

    #[error("no winner can be determined from this score")]
    NoWinner,

    #[error("match was modified concurrently (expected revision {expected}, found {actual})")]
    StaleRevision { expected: u64, actual: u64 },

    #[error("a proposal must offer at least one time")]
    EmptyProposal,

    #[error("the chosen time was not offered in the current proposal")]
    TimeNotOffered,

    #[error("player {0} is not a participant in this match")]
    UnknownPlayer(i64),

    #[error("malformed score: {0}")]
    MalformedScore(String),

    #[error("unknown match status: {0:?}")]
    UnknownStatus(String),
}

pub type Result<T> = std::result::Result<T, Error>;
