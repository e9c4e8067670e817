//! Tiered classification of window-relative price movement.

use std::fmt;

use serde::{Serialize, Serializer};

/// Severity bucket for a detected move. Tiers are independent: firing
/// one neither implies nor clears another for the same instrument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    T5,
    T10,
    T20,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::T5, Tier::T10, Tier::T20];

    /// Absolute fractional change that fires this tier.
    pub fn threshold(self) -> f64 {
        match self {
            Tier::T5 => 0.05,
            Tier::T10 => 0.10,
            Tier::T20 => 0.20,
        }
    }

    pub fn percent(self) -> u8 {
        match self {
            Tier::T5 => 5,
            Tier::T10 => 10,
            Tier::T20 => 20,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

// On the wire a tier is its percent threshold: 5, 10 or 20.
impl Serialize for Tier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.percent())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Outcome of classifying one (current, reference) pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub tier: Tier,
    pub direction: Direction,
    /// Signed change relative to the reference price, in percent.
    pub percent_change: f64,
}

/// Classify the relative move from `reference` to `current`.
///
/// Pure: no side effects and no registry knowledge, so the threshold
/// policy is testable on its own. Callers guarantee a nonzero
/// `reference`; `HistoryStore::window_stats` guards the zero case.
pub fn classify(current: f64, reference: f64) -> Option<Classification> {
    let delta = (current - reference) / reference;

    let tier = if delta.abs() >= Tier::T20.threshold() {
        Tier::T20
    } else if delta.abs() >= Tier::T10.threshold() {
        Tier::T10
    } else if delta.abs() >= Tier::T5.threshold() {
        Tier::T5
    } else {
        return None;
    };

    // delta == 0 never reaches a tier, so the down branch is never hit
    // for a flat price.
    let direction = if delta > 0.0 {
        Direction::Up
    } else {
        Direction::Down
    };

    Some(Classification {
        tier,
        direction,
        percent_change: delta * 100.0,
    })
}
