use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::finalize::{FinalScore, SetResult};
use crate::negotiation::{Logistics, MatchLogistics, Negotiation, Offer, Proposal};
use crate::side::Side;

/// Most sets a reported score can hold (best of three).
const MAX_REPORTED_SETS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Pending,
    Proposed,
    Scheduled,
    Reported,
    Confirmed,
    Disputed,
    Walkover,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "PENDING",
            MatchStatus::Proposed => "PROPOSED",
            MatchStatus::Scheduled => "SCHEDULED",
            MatchStatus::Reported => "REPORTED",
            MatchStatus::Confirmed => "CONFIRMED",
            MatchStatus::Disputed => "DISPUTED",
            MatchStatus::Walkover => "WALKOVER",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Confirmed | MatchStatus::Walkover)
    }

    pub fn all() -> &'static [MatchStatus] {
        &[
            MatchStatus::Pending,
            MatchStatus::Proposed,
            MatchStatus::Scheduled,
            MatchStatus::Reported,
            MatchStatus::Confirmed,
            MatchStatus::Disputed,
            MatchStatus::Walkover,
        ]
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MatchStatus::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::UnknownStatus(s.to_string()))
    }
}

/// The lifecycle operations, for error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchAction {
    Propose,
    Accept,
    Report,
    Confirm,
    Dispute,
    Walkover,
}

impl fmt::Display for MatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchAction::Propose => "propose a time for",
            MatchAction::Accept => "accept a time for",
            MatchAction::Report => "report a score for",
            MatchAction::Confirm => "confirm",
            MatchAction::Dispute => "dispute",
            MatchAction::Walkover => "award a walkover for",
        })
    }
}

/// A submitted result, keyed by player id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedScore {
    pub sets: Vec<SetResult>,
    pub winner_id: i64,
}

/// A pairing between two players and where it stands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub player_a: i64,
    pub player_b: i64,
    pub status: MatchStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub score: Option<ReportedScore>,
    /// Side that filed the current score.
    pub reported_by: Option<Side>,
    pub logistics: Option<MatchLogistics>,
    pub negotiation: Negotiation,
    /// Bumped by every transition; persistence compares and swaps on it.
    pub revision: u64,
}

impl Match {
    pub fn new(id: i64, player_a: i64, player_b: i64) -> Self {
        Self {
            id,
            player_a,
            player_b,
            status: MatchStatus::Pending,
            scheduled_at: None,
            score: None,
            reported_by: None,
            logistics: None,
            negotiation: Negotiation::new(),
            revision: 0,
        }
    }

    pub fn side_of(&self, player_id: i64) -> Result<Side> {
        if player_id == self.player_a {
            Ok(Side::A)
        } else if player_id == self.player_b {
            Ok(Side::B)
        } else {
            Err(Error::UnknownPlayer(player_id))
        }
    }

    pub fn player_of(&self, side: Side) -> i64 {
        match side {
            Side::A => self.player_a,
            Side::B => self.player_b,
        }
    }

    pub fn check_revision(&self, expected: u64) -> Result<()> {
        if self.revision != expected {
            return Err(Error::StaleRevision {
                expected,
                actual: self.revision,
            });
        }
        Ok(())
    }

    /// Translate a side-keyed result into a player-keyed report.
    pub fn report_from(&self, result: &FinalScore) -> ReportedScore {
        ReportedScore {
            sets: result.sets.clone(),
            winner_id: self.player_of(result.winner),
        }
    }

    pub fn propose(&mut self, by: Side, offer: Offer, now: DateTime<Utc>) -> Result<&Proposal> {
        self.require(MatchAction::Propose, &[MatchStatus::Pending, MatchStatus::Proposed])?;
        let id = self.id;
        self.negotiation.offer(id, by, offer, now)?;
        self.move_to(MatchStatus::Proposed);
        self.negotiation.current_offer().ok_or(Error::EmptyProposal)
    }

    /// Schedule the match at `chosen`. With no proposal on record the time
    /// was agreed elsewhere and is taken as given.
    pub fn accept(
        &mut self,
        by: Side,
        chosen: DateTime<Utc>,
        logistics: Option<Logistics>,
    ) -> Result<()> {
        self.require(MatchAction::Accept, &[MatchStatus::Pending, MatchStatus::Proposed])?;
        let offered = self
            .negotiation
            .check_acceptance(by, &chosen)?
            .and_then(|offer| offer.logistics.clone());

        self.logistics = logistics.or(offered).map(|logistics| MatchLogistics {
            logistics,
            settled: false,
        });
        self.scheduled_at = Some(chosen);
        self.move_to(MatchStatus::Scheduled);
        Ok(())
    }

    /// File a score, or replace one that has not been confirmed yet.
    pub fn submit_score(&mut self, by: Side, score: ReportedScore) -> Result<()> {
        self.require(MatchAction::Report, &[MatchStatus::Scheduled, MatchStatus::Reported])?;
        self.side_of(score.winner_id)?;
        if score.sets.is_empty() {
            return Err(Error::MalformedScore("no sets".into()));
        }
        if score.sets.len() > MAX_REPORTED_SETS {
            return Err(Error::MalformedScore(format!(
                "{} sets in a best-of-three match",
                score.sets.len()
            )));
        }

        self.score = Some(score);
        self.reported_by = Some(by);
        self.move_to(MatchStatus::Reported);
        Ok(())
    }

    /// Confirm the current report. Only the side that did not file it may.
    pub fn confirm(&mut self, by: Side) -> Result<()> {
        self.require(MatchAction::Confirm, &[MatchStatus::Reported])?;
        if self.reported_by == Some(by) {
            return Err(Error::NotYourTurn);
        }
        self.move_to(MatchStatus::Confirmed);
        Ok(())
    }

    pub fn dispute(&mut self) -> Result<()> {
        self.require(MatchAction::Dispute, &[MatchStatus::Reported])?;
        self.move_to(MatchStatus::Disputed);
        Ok(())
    }

    /// Administrative void. Any reported score is discarded.
    pub fn walkover(&mut self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(self.invalid(MatchAction::Walkover));
        }
        self.score = None;
        self.reported_by = None;
        self.move_to(MatchStatus::Walkover);
        Ok(())
    }

    pub fn winner_id(&self) -> Option<i64> {
        match self.status {
            MatchStatus::Reported | MatchStatus::Confirmed | MatchStatus::Disputed => {
                self.score.as_ref().map(|s| s.winner_id)
            }
            _ => None,
        }
    }

    fn require(&self, action: MatchAction, allowed: &[MatchStatus]) -> Result<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: MatchAction) -> Error {
        Error::InvalidTransition {
            from: self.status,
            action,
        }
    }

    fn move_to(&mut self, status: MatchStatus) {
        if self.status != status {
            info!(match_id = self.id, from = %self.status, to = %status, "match status");
        }
        self.status = status;
        self.revision += 1;
    }
}
