use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::score::{CompletedSet, ScoreState, ScoringMode};
use crate::side::Side;

/// One set of a finalized result. Tiebreak points are present only for a
/// set that went to a tiebreak (or was abandoned during one).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetResult {
    pub score_a: u16,
    pub score_b: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiebreak_a: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiebreak_b: Option<u16>,
}

impl From<&CompletedSet> for SetResult {
    fn from(set: &CompletedSet) -> Self {
        Self {
            score_a: set.games_a,
            score_b: set.games_b,
            tiebreak_a: set.tiebreak.map(|t| t.a),
            tiebreak_b: set.tiebreak.map(|t| t.b),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub sets: Vec<SetResult>,
    pub winner: Side,
}

/// Turn a scoring state into a result.
///
/// A completed tennis match yields its sets and the two-set winner. An
/// abandoned one yields its completed sets plus the in-progress set, and
/// needs `winner_override` to say who was awarded the match. Ladder mode
/// yields a single set and is won by the higher tally; a tie has no winner.
pub fn finalize(state: &ScoreState, winner_override: Option<Side>) -> Result<FinalScore> {
    match state.mode {
        ScoringMode::Tennis => {
            let mut sets: Vec<SetResult> = state.completed_sets.iter().map(SetResult::from).collect();
            if let Some(winner) = state.match_winner() {
                return Ok(FinalScore { sets, winner });
            }

            let winner = winner_override.ok_or(Error::NoWinner)?;
            let tiebreak_started = state.in_tiebreak && (state.points_a > 0 || state.points_b > 0);
            sets.push(SetResult {
                score_a: state.games_a,
                score_b: state.games_b,
                tiebreak_a: tiebreak_started.then_some(state.points_a),
                tiebreak_b: tiebreak_started.then_some(state.points_b),
            });
            Ok(FinalScore { sets, winner })
        }
        ScoringMode::Ladder => {
            let winner = match state.games_a.cmp(&state.games_b) {
                std::cmp::Ordering::Greater => Side::A,
                std::cmp::Ordering::Less => Side::B,
                std::cmp::Ordering::Equal => return Err(Error::NoWinner),
            };
            Ok(FinalScore {
                sets: vec![SetResult {
                    score_a: state.games_a,
                    score_b: state.games_b,
                    tiebreak_a: None,
                    tiebreak_b: None,
                }],
                winner,
            })
        }
    }
}
