use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::finalize::FinalScore;
use crate::lifecycle::{Match, MatchStatus, ReportedScore};
use crate::negotiation::{Logistics, MatchLogistics, Offer, Proposal};
use crate::score::{point_labels, ScoreState, ScoringEvent, ScoringMode};
use crate::session::ScoringSession;
use crate::side::Side;

/// Pair two players.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMatchRequest {
    pub player_a: i64,
    pub player_b: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub player_id: i64,
    pub proposed_times: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub logistics: Option<Logistics>,
    #[serde(default)]
    pub expected_revision: Option<u64>,
}

impl ProposalRequest {
    pub fn offer(&self) -> Offer {
        Offer {
            times: self.proposed_times.clone(),
            message: self.message.clone(),
            logistics: self.logistics.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptRequest {
    pub player_id: i64,
    pub chosen_time: DateTime<Utc>,
    #[serde(default)]
    pub logistics: Option<Logistics>,
    #[serde(default)]
    pub expected_revision: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub player_id: i64,
    pub score: ReportedScore,
    #[serde(default)]
    pub expected_revision: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmRequest {
    pub player_id: i64,
    #[serde(default)]
    pub expected_revision: Option<u64>,
}

/// Body for administrative actions (dispute, walkover).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminRequest {
    #[serde(default)]
    pub expected_revision: Option<u64>,
}

/// A match as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchView {
    pub id: i64,
    pub player_a: i64,
    pub player_b: i64,
    pub status: MatchStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub score: Option<ReportedScore>,
    pub reported_by: Option<Side>,
    /// Set once a result is on record (reported, confirmed or disputed).
    #[serde(default)]
    pub winner_id: Option<i64>,
    pub logistics: Option<MatchLogistics>,
    pub proposals: Vec<Proposal>,
    pub revision: u64,
}

impl From<&Match> for MatchView {
    fn from(m: &Match) -> Self {
        Self {
            id: m.id,
            player_a: m.player_a,
            player_b: m.player_b,
            status: m.status,
            scheduled_at: m.scheduled_at,
            score: m.score.clone(),
            reported_by: m.reported_by,
            winner_id: m.winner_id(),
            logistics: m.logistics.clone(),
            proposals: m.negotiation.proposals().to_vec(),
            revision: m.revision,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub match_id: Option<i64>,
    pub mode: ScoringMode,
    #[serde(default)]
    pub serving_first: Option<String>,
}

impl StartSessionRequest {
    pub fn initial_state(&self) -> Result<ScoreState> {
        let serving_first = match &self.serving_first {
            Some(token) => token.parse()?,
            None => Side::A,
        };
        Ok(ScoreState::new(self.mode, serving_first))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Game,
    Tiebreak,
    Point,
}

/// A scoring event as sent by a client. The side is a raw token so an
/// unrecognized one surfaces as `InvalidSide`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRequest {
    pub kind: EventKind,
    pub side: String,
}

impl EventRequest {
    pub fn to_event(&self) -> Result<ScoringEvent> {
        let side: Side = self.side.parse()?;
        Ok(match self.kind {
            EventKind::Game => ScoringEvent::Game(side),
            EventKind::Tiebreak => ScoringEvent::Tiebreak(side),
            EventKind::Point => ScoringEvent::Point(side),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub code: String,
    pub match_id: Option<i64>,
    pub state: ScoreState,
    /// In-progress game as called on court, side A first.
    pub call: (String, String),
    pub can_undo: bool,
    pub complete: bool,
}

impl From<&ScoringSession> for SessionView {
    fn from(session: &ScoringSession) -> Self {
        Self {
            code: session.code.clone(),
            match_id: session.match_id,
            state: session.state.clone(),
            call: point_labels(&session.state),
            can_undo: session.can_undo(),
            complete: session.is_complete(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinishRequest {
    /// Player submitting the result when the session scores a match.
    #[serde(default)]
    pub player_id: Option<i64>,
    /// Side awarded an unfinished match.
    #[serde(default)]
    pub winner_override: Option<String>,
}

impl FinishRequest {
    pub fn winner_override(&self) -> Result<Option<Side>> {
        self.winner_override
            .as_deref()
            .map(str::parse::<Side>)
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishResponse {
    pub result: FinalScore,
    #[serde(default)]
    pub reported: Option<MatchView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn event_request_parses_side_token() {
        let req: EventRequest =
            serde_json::from_str(r#"{"kind":"Point","side":"b"}"#).unwrap();
        assert_eq!(req.to_event().unwrap(), ScoringEvent::Point(Side::B));

        let bad = EventRequest {
            kind: EventKind::Game,
            side: "X".into(),
        };
        assert_eq!(bad.to_event(), Err(Error::InvalidSide("X".into())));
    }

    #[test]
    fn finish_request_override() {
        let req = FinishRequest {
            player_id: None,
            winner_override: Some("A".into()),
        };
        assert_eq!(req.winner_override().unwrap(), Some(Side::A));
        assert_eq!(FinishRequest::default().winner_override().unwrap(), None);
        let bad = FinishRequest {
            player_id: None,
            winner_override: Some("draw".into()),
        };
        assert!(bad.winner_override().is_err());
    }

    #[test]
    fn proposal_request_accepts_iso8601() {
        let req: ProposalRequest = serde_json::from_str(
            r#"{"player_id":1,"proposed_times":["2026-05-02T18:00:00Z"]}"#,
        )
        .unwrap();
        assert_eq!(req.offer().times.len(), 1);
        assert!(req.expected_revision.is_none());
    }

    #[test]
    fn session_view_calls_the_game() {
        let mut session = ScoringSession::new("XYZ".into(), None, ScoreState::tennis(Side::A));
        session.record(ScoringEvent::Point(Side::A));
        let view = SessionView::from(&session);
        assert_eq!(view.call, ("15".to_string(), "0".to_string()));
        assert!(view.can_undo);
        assert!(!view.complete);
    }
}
