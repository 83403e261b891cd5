use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::side::Side;

/// Who pays for the court.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitPolicy {
    #[default]
    Even,
    BookerPays,
    LoserPays,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_cents: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booked_by: Option<Side>,
    #[serde(default)]
    pub split: SplitPolicy,
}

/// Logistics attached to a scheduled match, with a settlement flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchLogistics {
    #[serde(flatten)]
    pub logistics: Logistics,
    pub settled: bool,
}

/// A time-slot offer. Never edited once made.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Position in the match's negotiation, starting at 0.
    pub seq: u32,
    pub match_id: i64,
    pub proposed_by: Side,
    /// Candidate times, ascending and without duplicates.
    pub proposed_times: Vec<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logistics: Option<Logistics>,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    pub fn offers(&self, time: &DateTime<Utc>) -> bool {
        self.proposed_times.binary_search(time).is_ok()
    }
}

/// Contents of a new proposal, before it is numbered and stamped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub times: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub logistics: Option<Logistics>,
}

/// Alternating-offer negotiation for one match. Only the most recent
/// proposal (the current offer) can be accepted, and never by its author.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Negotiation {
    proposals: Vec<Proposal>,
    current: Option<usize>,
}

impl Negotiation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted proposals in any order.
    pub fn from_proposals(mut proposals: Vec<Proposal>) -> Self {
        proposals.sort_by_key(|p| p.seq);
        let current = proposals.len().checked_sub(1);
        Self { proposals, current }
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn current_offer(&self) -> Option<&Proposal> {
        self.current.and_then(|idx| self.proposals.get(idx))
    }

    pub fn offer(
        &mut self,
        match_id: i64,
        proposed_by: Side,
        offer: Offer,
        now: DateTime<Utc>,
    ) -> Result<&Proposal> {
        let mut times = offer.times;
        times.sort();
        times.dedup();
        if times.is_empty() {
            return Err(Error::EmptyProposal);
        }

        self.proposals.push(Proposal {
            seq: self.proposals.len() as u32,
            match_id,
            proposed_by,
            proposed_times: times,
            message: offer.message,
            logistics: offer.logistics,
            created_at: now,
        });
        let idx = self.proposals.len() - 1;
        self.current = Some(idx);
        Ok(&self.proposals[idx])
    }

    /// Check that `accepting` may take `chosen` from the current offer.
    /// Returns the offer, or `None` when nothing has been proposed yet.
    pub fn check_acceptance(
        &self,
        accepting: Side,
        chosen: &DateTime<Utc>,
    ) -> Result<Option<&Proposal>> {
        let Some(offer) = self.current_offer() else {
            return Ok(None);
        };
        if offer.proposed_by == accepting {
            return Err(Error::NotYourTurn);
        }
        if !offer.offers(chosen) {
            return Err(Error::TimeNotOffered);
        }
        Ok(Some(offer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, hour, 0, 0).unwrap()
    }

    fn times(hours: &[u32]) -> Offer {
        Offer {
            times: hours.iter().map(|h| at(*h)).collect(),
            ..Offer::default()
        }
    }

    #[test]
    fn offer_normalizes_times() {
        let mut n = Negotiation::new();
        let p = n.offer(1, Side::A, times(&[18, 9, 18, 12]), at(0)).unwrap();
        assert_eq!(p.proposed_times, vec![at(9), at(12), at(18)]);
        assert_eq!(p.seq, 0);
    }

    #[test]
    fn empty_offer_is_rejected() {
        let mut n = Negotiation::new();
        assert_eq!(
            n.offer(1, Side::A, Offer::default(), at(0)).unwrap_err(),
            Error::EmptyProposal
        );
        assert!(n.current_offer().is_none());
    }

    #[test]
    fn author_cannot_accept_own_offer() {
        let mut n = Negotiation::new();
        n.offer(1, Side::A, times(&[10]), at(0)).unwrap();
        assert_eq!(
            n.check_acceptance(Side::A, &at(10)).unwrap_err(),
            Error::NotYourTurn
        );
        assert!(n.check_acceptance(Side::B, &at(10)).unwrap().is_some());
    }

    #[test]
    fn only_latest_offer_is_actionable() {
        let mut n = Negotiation::new();
        n.offer(1, Side::B, times(&[10]), at(0)).unwrap();
        n.offer(1, Side::A, times(&[15]), at(1)).unwrap();

        // B's earlier 10:00 offer is no longer on the table for A.
        assert_eq!(
            n.check_acceptance(Side::A, &at(10)).unwrap_err(),
            Error::NotYourTurn
        );
        assert_eq!(
            n.check_acceptance(Side::B, &at(10)).unwrap_err(),
            Error::TimeNotOffered
        );
        assert!(n.check_acceptance(Side::B, &at(15)).is_ok());
        assert_eq!(n.proposals().len(), 2);
    }

    #[test]
    fn rebuilt_negotiation_points_at_latest() {
        let mut n = Negotiation::new();
        n.offer(1, Side::A, times(&[10]), at(0)).unwrap();
        n.offer(1, Side::B, times(&[11]), at(1)).unwrap();
        let mut persisted = n.proposals().to_vec();
        persisted.reverse();

        let rebuilt = Negotiation::from_proposals(persisted);
        assert_eq!(rebuilt, n);
        assert_eq!(rebuilt.current_offer().map(|p| p.proposed_by), Some(Side::B));
    }

    #[test]
    fn nothing_proposed_yet() {
        let n = Negotiation::new();
        assert!(n.check_acceptance(Side::A, &at(10)).unwrap().is_none());
    }
}
