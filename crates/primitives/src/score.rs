use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Cumulative weight of a chain segment.
///
/// Scores are arbitrary precision; summing per-link scores over a long chain
/// must not overflow 64-bit arithmetic, so the accumulator is a [`U256`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct ChainScore(U256);

impl ChainScore {
    /// The zero score.
    pub const ZERO: Self = Self(U256::ZERO);

    /// Create a score from a raw value.
    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    /// The raw score value.
    pub const fn get(&self) -> U256 {
        self.0
    }

    /// Subtract another score, returning `None` on underflow.
    ///
    /// Scores are unsigned; callers that need a signed comparison use
    /// [`ChainScore::delta`] instead.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Compute the signed difference `peer - local` as a [`ScoreDelta`].
    pub fn delta(peer: Self, local: Self) -> ScoreDelta {
        if peer > local {
            ScoreDelta { improvement: true, magnitude: Self(peer.0 - local.0) }
        } else {
            ScoreDelta { improvement: false, magnitude: Self(local.0 - peer.0) }
        }
    }
}

impl Add for ChainScore {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for ChainScore {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl From<U256> for ChainScore {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<u64> for ChainScore {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

/// The signed difference between two chain scores.
///
/// A fork-choice decision commits only when the delta is a strict
/// improvement; an equal score is not an improvement, which prevents
/// oscillation between equal-score chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    /// Whether the peer chain scored strictly higher than the local chain.
    pub improvement: bool,
    /// The absolute difference between the two scores.
    pub magnitude: ChainScore,
}

impl ScoreDelta {
    /// Returns `true` if the delta represents a strict improvement.
    pub const fn is_improvement(&self) -> bool {
        self.improvement
    }
}
