//! Error types for ladder construction, allocation handling and optimization.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SaleError>;

/// Errors surfaced by the sell-ladder core.
///
/// All of them are raised synchronously by the call that detected them; the
/// computation itself never retries.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SaleError {
    /// Ladder and allocation disagree on the number of tiers.
    #[error("tier count mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Tier index past the end of the ladder.
    #[error("tier {tier} is out of range for a {tiers}-tier ladder")]
    TierOutOfRange { tier: usize, tiers: usize },

    /// A ladder needs at least one tier.
    #[error("price ladder has no tiers")]
    EmptyLadder,

    /// Probability outside [0, 1] (or NaN).
    #[error("tier {tier}: probability {value} is outside [0, 1]")]
    InvalidProbability { tier: usize, value: f64 },

    /// Price that is not a positive finite number.
    #[error("tier {tier}: price {value} must be positive and finite")]
    InvalidPrice { tier: usize, value: f64 },

    /// Negative or non-finite allocation fraction.
    #[error("tier {tier}: fraction {value} must be non-negative and finite")]
    InvalidFraction { tier: usize, value: f64 },

    /// Initial allocation does not sum to one.
    #[error("allocation sums to {sum}, expected 1.0")]
    AllocationSum { sum: f64 },

    /// Out-of-range scalar parameter.
    #[error("invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Renormalization would divide by zero.
    #[error("cannot renormalize allocation: fractions sum to {total}")]
    ZeroTotal { total: f64 },
}

impl SaleError {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, value: f64) -> Self {
        Self::InvalidParameter { name, value }
    }

    /// Create a length mismatch error.
    pub fn length_mismatch(expected: usize, actual: usize) -> Self {
        Self::LengthMismatch { expected, actual }
    }
}
