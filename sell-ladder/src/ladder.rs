//! Price ladder: the ordered set of mutually exclusive price ceilings.
//!
//! Each tier pairs a sale price with the probability that the market reaches
//! at least that tier. Tier 0 is the fallback outcome: it is realized whenever
//! no other tier qualifies.
//!
//! ## Tier selection
//!
//! A draw `r` in `[0, 1)` realizes the *highest-indexed* tier whose
//! probability is `>= r`. With a non-increasing probability ladder this is
//! the usual "reach tier i with probability p_i" reading. With an arbitrary
//! ladder the rule still holds but can pick a tier that is not intuitive, so
//! such ladders are accepted and reported through [`PriceLadder::is_monotonic`].

use tracing::warn;

use crate::error::{Result, SaleError};

/// A single price tier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceTier {
    /// Sale price per token at this tier.
    pub price: f64,

    /// Probability threshold that a draw must not exceed to reach this tier.
    pub probability: f64,
}

impl PriceTier {
    pub fn new(price: f64, probability: f64) -> Self {
        Self { price, probability }
    }
}

/// Validated, immutable price ladder.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceLadder {
    tiers: Vec<PriceTier>,
}

impl PriceLadder {
    /// Build a ladder from parallel price and probability sequences.
    pub fn new(prices: &[f64], probabilities: &[f64]) -> Result<Self> {
        if prices.len() != probabilities.len() {
            return Err(SaleError::length_mismatch(prices.len(), probabilities.len()));
        }

        let tiers = prices
            .iter()
            .zip(probabilities)
            .map(|(&price, &probability)| PriceTier::new(price, probability))
            .collect();

        Self::from_tiers(tiers)
    }

    /// Build a ladder from already-paired tiers.
    pub fn from_tiers(tiers: Vec<PriceTier>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(SaleError::EmptyLadder);
        }

        for (tier, t) in tiers.iter().enumerate() {
            if !t.price.is_finite() || t.price <= 0.0 {
                return Err(SaleError::InvalidPrice { tier, value: t.price });
            }
            if !(0.0..=1.0).contains(&t.probability) {
                return Err(SaleError::InvalidProbability {
                    tier,
                    value: t.probability,
                });
            }
        }

        let ladder = Self { tiers };
        if !ladder.is_monotonic() {
            warn!(
                tiers = ladder.len(),
                "probabilities are not non-increasing; tier selection may be unintuitive"
            );
        }

        Ok(ladder)
    }

    /// Number of tiers (always at least one).
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Always false for a constructed ladder.
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn tiers(&self) -> &[PriceTier] {
        &self.tiers
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.tiers.iter().map(|t| t.price)
    }

    /// True when probabilities never increase from one tier to the next.
    pub fn is_monotonic(&self) -> bool {
        self.tiers
            .windows(2)
            .all(|w| w[1].probability <= w[0].probability)
    }

    /// Tier realized by the uniform draw `r`.
    ///
    /// Scans every tier and keeps the last one whose probability is `>= r`,
    /// falling back to tier 0.
    pub fn realized_tier(&self, r: f64) -> usize {
        let mut realized = 0;
        for (i, tier) in self.tiers.iter().enumerate() {
            if tier.probability >= r {
                realized = i;
            }
        }
        realized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference_ladder() -> PriceLadder {
        PriceLadder::new(&[10.0, 20.0, 30.0], &[1.0, 0.8, 0.3]).unwrap()
    }

    #[test]
    fn test_realized_tier_reference_ladder() {
        let ladder = reference_ladder();

        assert_eq!(ladder.realized_tier(0.05), 2);
        assert_eq!(ladder.realized_tier(0.3), 2);
        assert_eq!(ladder.realized_tier(0.31), 1);
        assert_eq!(ladder.realized_tier(0.8), 1);
        assert_eq!(ladder.realized_tier(0.9), 0);
        assert_eq!(ladder.realized_tier(0.999), 0);
    }

    #[test]
    fn test_all_certain_tiers_realize_last_index() {
        let ladder = PriceLadder::new(&[1.0, 2.0, 3.0, 4.0], &[1.0; 4]).unwrap();
        for r in [0.0, 0.25, 0.5, 0.75, 0.999_999] {
            assert_eq!(ladder.realized_tier(r), 3);
        }
    }

    #[test]
    fn test_fallback_is_tier_zero() {
        // Nothing qualifies for a draw above every threshold.
        let ladder = PriceLadder::new(&[5.0, 6.0], &[0.1, 0.05]).unwrap();
        assert_eq!(ladder.realized_tier(0.5), 0);
    }

    #[test]
    fn test_non_monotonic_ladder_keeps_last_match() {
        // Tier 1 is skipped by the draw but tier 2 still qualifies.
        let ladder = PriceLadder::new(&[10.0, 20.0, 30.0], &[1.0, 0.2, 0.4]).unwrap();
        assert!(!ladder.is_monotonic());
        assert_eq!(ladder.realized_tier(0.3), 2);
        assert_eq!(ladder.realized_tier(0.1), 2);
    }

    #[test]
    fn test_monotonic_detection() {
        assert!(reference_ladder().is_monotonic());
        assert!(PriceLadder::new(&[1.0], &[0.5]).unwrap().is_monotonic());
    }

    proptest! {
        #[test]
        fn prop_realized_tier_in_range(
            tiers in prop::collection::vec((0.01f64..1_000.0, 0.0f64..=1.0), 1..12),
            r in 0.0f64..1.0,
        ) {
            let len = tiers.len();
            let ladder = PriceLadder::from_tiers(
                tiers.into_iter().map(|(price, p)| PriceTier::new(price, p)).collect(),
            ).unwrap();

            let tier = ladder.realized_tier(r);
            prop_assert!(tier < len);
            // No later tier qualifies; the chosen one does unless it is the fallback.
            prop_assert!(ladder.tiers()[tier + 1..].iter().all(|t| t.probability < r));
            prop_assert!(tier == 0 || ladder.tiers()[tier].probability >= r);
        }
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let err = PriceLadder::new(&[10.0, 20.0], &[1.0]).unwrap_err();
        assert_eq!(err, SaleError::LengthMismatch { expected: 2, actual: 1 });
    }

    #[test]
    fn test_rejects_empty_ladder() {
        assert_eq!(PriceLadder::new(&[], &[]).unwrap_err(), SaleError::EmptyLadder);
    }

    #[test]
    fn test_rejects_bad_probability() {
        let err = PriceLadder::new(&[10.0, 20.0], &[1.0, 1.5]).unwrap_err();
        assert!(matches!(err, SaleError::InvalidProbability { tier: 1, .. }));

        let err = PriceLadder::new(&[10.0], &[f64::NAN]).unwrap_err();
        assert!(matches!(err, SaleError::InvalidProbability { tier: 0, .. }));
    }

    #[test]
    fn test_rejects_bad_price() {
        let err = PriceLadder::new(&[10.0, 0.0], &[1.0, 0.5]).unwrap_err();
        assert!(matches!(err, SaleError::InvalidPrice { tier: 1, .. }));

        let err = PriceLadder::new(&[f64::INFINITY], &[1.0]).unwrap_err();
        assert!(matches!(err, SaleError::InvalidPrice { tier: 0, .. }));
    }
}
