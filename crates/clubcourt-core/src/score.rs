use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::side::Side;

/// Games needed to take a set (with a two-game lead).
pub const GAMES_PER_SET: u16 = 6;
/// Sets needed to take a best-of-three match.
pub const SETS_TO_WIN: usize = 2;
/// Points needed to take a regular game (with a two-point lead).
const POINTS_PER_GAME: u16 = 4;
/// Points needed to take a tiebreak (with a two-point lead).
const TIEBREAK_POINTS: u16 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringMode {
    /// Best of three sets, tiebreak at 6-6, deuce/advantage games.
    Tennis,
    /// "Stigen": a single running game tally per side.
    Ladder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiebreakScore {
    pub a: u16,
    pub b: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSet {
    pub games_a: u16,
    pub games_b: u16,
    pub tiebreak: Option<TiebreakScore>,
}

impl CompletedSet {
    pub fn winner(&self) -> Side {
        if self.games_a > self.games_b {
            Side::A
        } else {
            Side::B
        }
    }
}

/// Score of a scoring session. Transitions never mutate a state in place;
/// they return a new one inside a [`ScoreUpdate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    pub mode: ScoringMode,
    /// Informational only.
    pub serving_first: Side,
    pub completed_sets: Vec<CompletedSet>,
    pub games_a: u16,
    pub games_b: u16,
    /// Game points, or tiebreak points while `in_tiebreak`.
    pub points_a: u16,
    pub points_b: u16,
    pub in_tiebreak: bool,
}

impl ScoreState {
    pub fn new(mode: ScoringMode, serving_first: Side) -> Self {
        Self {
            mode,
            serving_first,
            completed_sets: Vec::new(),
            games_a: 0,
            games_b: 0,
            points_a: 0,
            points_b: 0,
            in_tiebreak: false,
        }
    }

    pub fn tennis(serving_first: Side) -> Self {
        Self::new(ScoringMode::Tennis, serving_first)
    }

    pub fn ladder() -> Self {
        Self::new(ScoringMode::Ladder, Side::A)
    }

    pub fn games(&self, side: Side) -> u16 {
        match side {
            Side::A => self.games_a,
            Side::B => self.games_b,
        }
    }

    pub fn points(&self, side: Side) -> u16 {
        match side {
            Side::A => self.points_a,
            Side::B => self.points_b,
        }
    }

    fn games_mut(&mut self, side: Side) -> &mut u16 {
        match side {
            Side::A => &mut self.games_a,
            Side::B => &mut self.games_b,
        }
    }

    fn points_mut(&mut self, side: Side) -> &mut u16 {
        match side {
            Side::A => &mut self.points_a,
            Side::B => &mut self.points_b,
        }
    }

    pub fn sets_won(&self, side: Side) -> usize {
        self.completed_sets
            .iter()
            .filter(|set| set.winner() == side)
            .count()
    }

    /// The side holding two sets, if any. Always `None` in ladder mode.
    pub fn match_winner(&self) -> Option<Side> {
        if self.mode != ScoringMode::Tennis {
            return None;
        }
        Side::all()
            .iter()
            .copied()
            .find(|side| self.sets_won(*side) >= SETS_TO_WIN)
    }

    pub fn is_match_complete(&self) -> bool {
        self.match_winner().is_some()
    }

    fn reset_set(&mut self) {
        self.games_a = 0;
        self.games_b = 0;
        self.points_a = 0;
        self.points_b = 0;
        self.in_tiebreak = false;
    }
}

/// Result of feeding one event into the state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreUpdate {
    pub state: ScoreState,
    pub set_completed: bool,
    pub match_completed: bool,
}

impl ScoreUpdate {
    fn unchanged(state: &ScoreState) -> Self {
        Self {
            state: state.clone(),
            set_completed: false,
            match_completed: state.is_match_complete(),
        }
    }

    fn progressed(state: ScoreState) -> Self {
        Self {
            state,
            set_completed: false,
            match_completed: false,
        }
    }
}

/// A single scoring input, as recorded by a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "side")]
pub enum ScoringEvent {
    Game(Side),
    Tiebreak(Side),
    Point(Side),
}

pub fn apply_event(state: &ScoreState, event: ScoringEvent) -> ScoreUpdate {
    match event {
        ScoringEvent::Game(side) => apply_game_result(state, side),
        ScoringEvent::Tiebreak(side) => apply_tiebreak_result(state, side),
        ScoringEvent::Point(side) => apply_point(state, side),
    }
}

/// Award a whole game to `winner`.
///
/// In tennis mode this is a no-op while a tiebreak is being played or once
/// the match is over. In ladder mode it only bumps the running tally.
pub fn apply_game_result(state: &ScoreState, winner: Side) -> ScoreUpdate {
    match state.mode {
        ScoringMode::Ladder => {
            let mut next = state.clone();
            *next.games_mut(winner) += 1;
            debug!(side = %winner, games_a = next.games_a, games_b = next.games_b, "ladder game");
            ScoreUpdate::progressed(next)
        }
        ScoringMode::Tennis => {
            if state.in_tiebreak || state.is_match_complete() {
                return ScoreUpdate::unchanged(state);
            }
            let mut next = state.clone();
            next.points_a = 0;
            next.points_b = 0;
            *next.games_mut(winner) += 1;
            debug!(side = %winner, games_a = next.games_a, games_b = next.games_b, "game");
            close_set(next, winner)
        }
    }
}

/// Award the tiebreak (and therefore the set 7-6) to `winner`, recorded
/// as a 7-0 tiebreak. No-op unless a tiebreak is in progress.
pub fn apply_tiebreak_result(state: &ScoreState, winner: Side) -> ScoreUpdate {
    if state.mode != ScoringMode::Tennis || !state.in_tiebreak || state.is_match_complete() {
        return ScoreUpdate::unchanged(state);
    }
    let tally = match winner {
        Side::A => TiebreakScore { a: TIEBREAK_POINTS, b: 0 },
        Side::B => TiebreakScore { a: 0, b: TIEBREAK_POINTS },
    };
    complete_tiebreak(state.clone(), winner, tally)
}

/// Award a single point to `winner`, detecting game, tiebreak and set
/// completion. Ladder mode has no points, so a point counts as a game.
pub fn apply_point(state: &ScoreState, winner: Side) -> ScoreUpdate {
    if state.mode == ScoringMode::Ladder {
        return apply_game_result(state, winner);
    }
    if state.is_match_complete() {
        return ScoreUpdate::unchanged(state);
    }

    let mut next = state.clone();
    *next.points_mut(winner) += 1;
    let won = next.points(winner);
    let lost = next.points(winner.opponent());

    if next.in_tiebreak {
        if won >= TIEBREAK_POINTS && won - lost >= 2 {
            let tally = TiebreakScore {
                a: next.points_a,
                b: next.points_b,
            };
            return complete_tiebreak(next, winner, tally);
        }
        return ScoreUpdate::progressed(next);
    }

    if won >= POINTS_PER_GAME && won - lost >= 2 {
        return apply_game_result(state, winner);
    }
    ScoreUpdate::progressed(next)
}

fn close_set(mut next: ScoreState, winner: Side) -> ScoreUpdate {
    if next.games_a == GAMES_PER_SET && next.games_b == GAMES_PER_SET {
        debug!("tiebreak");
        next.in_tiebreak = true;
        return ScoreUpdate::progressed(next);
    }

    let won = next.games(winner);
    let lost = next.games(winner.opponent());
    if won < GAMES_PER_SET || won - lost < 2 {
        return ScoreUpdate::progressed(next);
    }

    next.completed_sets.push(CompletedSet {
        games_a: next.games_a,
        games_b: next.games_b,
        tiebreak: None,
    });
    next.reset_set();
    finish_set(next)
}

fn complete_tiebreak(mut next: ScoreState, winner: Side, tally: TiebreakScore) -> ScoreUpdate {
    let (games_a, games_b) = match winner {
        Side::A => (GAMES_PER_SET + 1, GAMES_PER_SET),
        Side::B => (GAMES_PER_SET, GAMES_PER_SET + 1),
    };
    next.completed_sets.push(CompletedSet {
        games_a,
        games_b,
        tiebreak: Some(tally),
    });
    next.reset_set();
    finish_set(next)
}

fn finish_set(next: ScoreState) -> ScoreUpdate {
    let match_completed = next.is_match_complete();
    debug!(sets = next.completed_sets.len(), match_completed, "set complete");
    ScoreUpdate {
        state: next,
        set_completed: true,
        match_completed,
    }
}

/// Human-readable labels for the in-progress game, side A first.
pub fn point_labels(state: &ScoreState) -> (String, String) {
    if state.mode == ScoringMode::Ladder {
        return (state.games_a.to_string(), state.games_b.to_string());
    }
    if state.in_tiebreak {
        return (state.points_a.to_string(), state.points_b.to_string());
    }

    let (a, b) = (state.points_a, state.points_b);
    if a >= 3 && b >= 3 {
        return match a.cmp(&b) {
            std::cmp::Ordering::Equal => ("40".into(), "40".into()),
            std::cmp::Ordering::Greater => ("AD".into(), "40".into()),
            std::cmp::Ordering::Less => ("40".into(), "AD".into()),
        };
    }
    (call(a).into(), call(b).into())
}

fn call(points: u16) -> &'static str {
    match points {
        0 => "0",
        1 => "15",
        2 => "30",
        _ => "40",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngExt;

    fn games(state: &ScoreState, winners: &[Side]) -> ScoreState {
        winners
            .iter()
            .fold(state.clone(), |s, w| apply_game_result(&s, *w).state)
    }

    fn points(state: &ScoreState, winners: &[Side]) -> ScoreState {
        winners
            .iter()
            .fold(state.clone(), |s, w| apply_point(&s, *w).state)
    }

    fn repeat(side: Side, n: usize) -> Vec<Side> {
        vec![side; n]
    }

    /// Reach 6-6 in the first set by alternating holds.
    fn at_six_all() -> ScoreState {
        let mut seq = Vec::new();
        for _ in 0..6 {
            seq.push(Side::A);
            seq.push(Side::B);
        }
        games(&ScoreState::tennis(Side::A), &seq)
    }

    #[test]
    fn love_game() {
        let s = points(&ScoreState::tennis(Side::A), &repeat(Side::A, 4));
        assert_eq!((s.games_a, s.games_b), (1, 0));
        assert_eq!((s.points_a, s.points_b), (0, 0));
    }

    #[test]
    fn deuce_needs_two_clear_points() {
        let mut seq = vec![Side::A, Side::A, Side::A, Side::B, Side::B, Side::B];
        let s = points(&ScoreState::tennis(Side::A), &seq);
        assert_eq!(point_labels(&s), ("40".to_string(), "40".to_string()));

        seq.push(Side::A);
        let s = points(&ScoreState::tennis(Side::A), &seq);
        assert_eq!(point_labels(&s), ("AD".to_string(), "40".to_string()));
        assert_eq!(s.games_a, 0);

        seq.push(Side::B);
        let s = points(&ScoreState::tennis(Side::A), &seq);
        assert_eq!(point_labels(&s), ("40".to_string(), "40".to_string()));

        seq.extend([Side::B, Side::B]);
        let s = points(&ScoreState::tennis(Side::A), &seq);
        assert_eq!((s.games_a, s.games_b), (0, 1));
    }

    #[test]
    fn point_labels_early_game() {
        let s = points(&ScoreState::tennis(Side::A), &[Side::A, Side::B, Side::A]);
        assert_eq!(point_labels(&s), ("30".to_string(), "15".to_string()));
    }

    #[test]
    fn set_completes_at_six_four() {
        let mut seq = repeat(Side::A, 5);
        seq.extend(repeat(Side::B, 4));
        seq.push(Side::A);
        let s = games(&ScoreState::tennis(Side::A), &seq);
        assert_eq!(
            s.completed_sets,
            vec![CompletedSet {
                games_a: 6,
                games_b: 4,
                tiebreak: None
            }]
        );
        assert_eq!((s.games_a, s.games_b), (0, 0));
    }

    #[test]
    fn six_five_is_not_a_set() {
        let mut seq = repeat(Side::A, 5);
        seq.extend(repeat(Side::B, 5));
        seq.push(Side::A);
        let update = apply_game_result(&games(&ScoreState::tennis(Side::A), &seq[..10]), Side::A);
        assert!(!update.set_completed);
        assert_eq!((update.state.games_a, update.state.games_b), (6, 5));

        let update = apply_game_result(&update.state, Side::A);
        assert!(update.set_completed);
        assert_eq!(update.state.completed_sets[0].games_a, 7);
        assert_eq!(update.state.completed_sets[0].games_b, 5);
    }

    #[test]
    fn six_all_enters_tiebreak() {
        let s = at_six_all();
        assert!(s.in_tiebreak);
        assert!(s.completed_sets.is_empty());
        assert_eq!((s.games_a, s.games_b), (6, 6));
    }

    #[test]
    fn tiebreak_shortcut_records_seven_love() {
        let update = apply_tiebreak_result(&at_six_all(), Side::B);
        assert!(update.set_completed);
        assert!(!update.match_completed);
        let set = update.state.completed_sets[0];
        assert_eq!((set.games_a, set.games_b), (6, 7));
        assert_eq!(set.tiebreak, Some(TiebreakScore { a: 0, b: 7 }));
        assert!(!update.state.in_tiebreak);
    }

    #[test]
    fn tiebreak_by_points_records_true_tally() {
        let mut seq = Vec::new();
        for _ in 0..6 {
            seq.push(Side::A);
            seq.push(Side::B);
        }
        // 6-6 in tiebreak points, then A takes two in a row.
        seq.extend([Side::A, Side::A]);
        let s = points(&at_six_all(), &seq);
        let set = s.completed_sets[0];
        assert_eq!((set.games_a, set.games_b), (7, 6));
        assert_eq!(set.tiebreak, Some(TiebreakScore { a: 8, b: 6 }));
    }

    #[test]
    fn tiebreak_entered_once_per_set() {
        let s = apply_tiebreak_result(&at_six_all(), Side::A).state;
        assert!(!s.in_tiebreak);
        let s = games(&s, &[Side::A, Side::B]);
        assert!(!s.in_tiebreak);
        assert_eq!(
            s.completed_sets
                .iter()
                .filter(|set| set.tiebreak.is_some())
                .count(),
            1
        );
    }

    #[test]
    fn game_result_is_noop_during_tiebreak() {
        let s = at_six_all();
        let update = apply_game_result(&s, Side::A);
        assert_eq!(update.state, s);
        assert!(!update.set_completed);
    }

    #[test]
    fn tiebreak_result_is_noop_outside_tiebreak() {
        let s = ScoreState::tennis(Side::A);
        let update = apply_tiebreak_result(&s, Side::A);
        assert_eq!(update.state, s);
        assert!(!update.set_completed);
    }

    #[test]
    fn straight_sets_complete_the_match() {
        let s = games(&ScoreState::tennis(Side::A), &repeat(Side::A, 11));
        assert_eq!(s.completed_sets.len(), 1);
        let update = apply_game_result(&s, Side::A);
        assert!(update.set_completed);
        assert!(update.match_completed);
        assert_eq!(update.state.match_winner(), Some(Side::A));

        // Terminal: further input leaves the state alone.
        let after = apply_game_result(&update.state, Side::B);
        assert!(after.match_completed);
        assert_eq!(after.state, update.state);
        let after = apply_point(&update.state, Side::B);
        assert_eq!(after.state, update.state);
    }

    #[test]
    fn three_set_match() {
        let mut seq = repeat(Side::A, 6);
        seq.extend(repeat(Side::B, 12));
        let s = games(&ScoreState::tennis(Side::B), &seq);
        assert_eq!(s.match_winner(), Some(Side::B));
        assert_eq!(s.completed_sets.len(), 2);

        let mut seq = repeat(Side::A, 6);
        seq.extend(repeat(Side::B, 6));
        seq.extend(repeat(Side::A, 6));
        let s = games(&ScoreState::tennis(Side::A), &seq);
        assert_eq!(s.completed_sets.len(), 3);
        assert_eq!(s.sets_won(Side::A), 2);
        assert!(s.is_match_complete());
    }

    #[test]
    fn ladder_counts_games_only() {
        let s = games(&ScoreState::ladder(), &[Side::A, Side::A, Side::B]);
        assert_eq!((s.games_a, s.games_b), (2, 1));
        assert!(s.completed_sets.is_empty());
        assert!(!s.in_tiebreak);

        let s = points(&s, &[Side::B]);
        assert_eq!((s.games_a, s.games_b), (2, 2));

        let update = apply_tiebreak_result(&s, Side::A);
        assert_eq!(update.state, s);
        assert_eq!(point_labels(&s), ("2".to_string(), "2".to_string()));
    }

    #[test]
    fn long_ladder_never_completes_a_set() {
        let s = games(&ScoreState::ladder(), &repeat(Side::B, 40));
        assert_eq!(s.games_b, 40);
        assert!(!s.is_match_complete());
    }

    /// Expand a game win into a point sequence, sometimes through deuce.
    fn game_as_points(winner: Side) -> Vec<Side> {
        let mut rng = rand::rng();
        let loser = winner.opponent();
        let mut seq = Vec::new();
        if rng.random_range(0..3) == 0 {
            seq.extend(repeat(winner, 3));
            seq.extend(repeat(loser, 3));
            for _ in 0..rng.random_range(0..3) {
                seq.push(loser);
                seq.push(winner);
            }
            seq.extend([winner, winner]);
        } else {
            seq.extend(repeat(loser, rng.random_range(0..3)));
            seq.extend(repeat(winner, 4));
        }
        seq
    }

    #[test]
    fn point_path_matches_game_path() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let mut by_game = ScoreState::tennis(Side::A);
            let mut by_point = ScoreState::tennis(Side::A);
            while !by_game.is_match_complete() {
                let winner = if rng.random_range(0..2) == 0 { Side::A } else { Side::B };
                if by_game.in_tiebreak {
                    by_game = apply_tiebreak_result(&by_game, winner).state;
                    by_point = points(&by_point, &repeat(winner, 7));
                } else {
                    by_game = apply_game_result(&by_game, winner).state;
                    let seq = game_as_points(winner);
                    by_point = points(&by_point, &seq);
                }
                assert_eq!(by_game, by_point);
                assert!(by_game.completed_sets.len() <= 3);
            }
            assert!(by_point.is_match_complete());
        }
    }
}
