use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One of the two sides of a pairing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn opponent(&self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Side::A => "A",
            Side::B => "B",
        }
    }

    pub fn all() -> &'static [Side] {
        &[Side::A, Side::B]
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Side::A),
            "B" | "b" => Ok(Side::B),
            other => Err(Error::InvalidSide(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_sides() {
        assert_eq!("A".parse::<Side>(), Ok(Side::A));
        assert_eq!(" b ".parse::<Side>(), Ok(Side::B));
    }

    #[test]
    fn rejects_unknown_token() {
        assert_eq!(
            "C".parse::<Side>(),
            Err(Error::InvalidSide("C".to_string()))
        );
        assert!("".parse::<Side>().is_err());
    }

    #[test]
    fn opponent_is_an_involution() {
        for side in Side::all() {
            assert_ne!(side.opponent(), *side);
            assert_eq!(side.opponent().opponent(), *side);
        }
    }
}
