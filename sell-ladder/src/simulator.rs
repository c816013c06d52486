//! Outcome simulator: one Monte Carlo scenario per call.
//!
//! A scenario draws which price tier the market reaches and books the net,
//! after-tax gain of selling every allocated tranche up to and including that
//! tier. The simulator holds no mutable state, so draws for the same
//! allocation can run on any number of threads.

use rand::Rng;
use rayon::prelude::*;

use crate::allocation::Allocation;
use crate::error::{Result, SaleError};
use crate::ladder::PriceLadder;
use crate::rng::draw_rng;

/// Position being sold down plus the market it is sold into.
#[derive(Clone, Debug)]
pub struct OutcomeSimulator {
    ladder: PriceLadder,
    total_tokens: f64,
    cost_basis: f64,
    capital_gains_rate: f64,
}

impl OutcomeSimulator {
    pub fn new(
        ladder: PriceLadder,
        total_tokens: f64,
        cost_basis: f64,
        capital_gains_rate: f64,
    ) -> Result<Self> {
        if !total_tokens.is_finite() || total_tokens <= 0.0 {
            return Err(SaleError::invalid_parameter("total_tokens", total_tokens));
        }
        if !cost_basis.is_finite() || cost_basis < 0.0 {
            return Err(SaleError::invalid_parameter("cost_basis", cost_basis));
        }
        if !(0.0..=1.0).contains(&capital_gains_rate) {
            return Err(SaleError::invalid_parameter(
                "capital_gains_rate",
                capital_gains_rate,
            ));
        }

        Ok(Self {
            ladder,
            total_tokens,
            cost_basis,
            capital_gains_rate,
        })
    }

    pub fn ladder(&self) -> &PriceLadder {
        &self.ladder
    }

    pub fn tiers(&self) -> usize {
        self.ladder.len()
    }

    pub fn total_tokens(&self) -> f64 {
        self.total_tokens
    }

    pub fn cost_basis(&self) -> f64 {
        self.cost_basis
    }

    pub fn capital_gains_rate(&self) -> f64 {
        self.capital_gains_rate
    }

    /// Tier realized by the uniform draw `r` in `[0, 1)`.
    pub fn realized_tier(&self, r: f64) -> usize {
        self.ladder.realized_tier(r)
    }

    /// Fail unless `allocation` has one fraction per ladder tier.
    pub fn check_allocation(&self, allocation: &Allocation) -> Result<()> {
        if allocation.len() != self.tiers() {
            return Err(SaleError::length_mismatch(self.tiers(), allocation.len()));
        }
        Ok(())
    }

    /// After-tax gain when `tier` is the highest tier reached.
    ///
    /// Every tranche `0..=tier` is sold at its own tier price.
    pub fn net_gain(&self, allocation: &Allocation, tier: usize) -> Result<f64> {
        self.check_allocation(allocation)?;
        if tier >= self.tiers() {
            return Err(SaleError::TierOutOfRange {
                tier,
                tiers: self.tiers(),
            });
        }
        Ok(self.gain_through(allocation, tier))
    }

    /// Net gain for a fixed draw `r`.
    pub fn outcome_for_draw(&self, allocation: &Allocation, r: f64) -> Result<f64> {
        self.check_allocation(allocation)?;
        Ok(self.gain_through(allocation, self.realized_tier(r)))
    }

    /// Draw one scenario and return its net gain.
    pub fn simulate_once<R: Rng + ?Sized>(&self, allocation: &Allocation, rng: &mut R) -> Result<f64> {
        self.check_allocation(allocation)?;
        Ok(self.draw(allocation, rng))
    }

    /// Outcome sample set of `num_simulations` independent draws.
    ///
    /// Draw `j` uses its own stream keyed by `(seed, evaluation)`, so the
    /// result does not depend on `parallel`.
    pub fn sample(
        &self,
        allocation: &Allocation,
        num_simulations: usize,
        seed: u64,
        evaluation: u64,
        parallel: bool,
    ) -> Result<Vec<f64>> {
        self.check_allocation(allocation)?;

        let sample_one = |j: u64| {
            let mut rng = draw_rng(seed, evaluation, j);
            self.draw(allocation, &mut rng)
        };

        let samples: Vec<f64> = if parallel {
            (0..num_simulations as u64).into_par_iter().map(sample_one).collect()
        } else {
            (0..num_simulations as u64).map(sample_one).collect()
        };
        Ok(samples)
    }

    // Callers have already checked the allocation length.
    fn draw<R: Rng + ?Sized>(&self, allocation: &Allocation, rng: &mut R) -> f64 {
        let r: f64 = rng.gen();
        self.gain_through(allocation, self.realized_tier(r))
    }

    fn gain_through(&self, allocation: &Allocation, tier: usize) -> f64 {
        let after_tax = 1.0 - self.capital_gains_rate;
        self.ladder
            .prices()
            .zip(allocation.fractions())
            .take(tier.saturating_add(1))
            .map(|(price, fraction)| {
                self.total_tokens * fraction * (price - self.cost_basis) * after_tax
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_simulator() -> OutcomeSimulator {
        let ladder = PriceLadder::new(&[10.0, 20.0, 30.0], &[1.0, 0.8, 0.3]).unwrap();
        OutcomeSimulator::new(ladder, 1000.0, 0.0, 0.25).unwrap()
    }

    fn reference_allocation() -> Allocation {
        Allocation::new(vec![0.5, 0.3, 0.2])
    }

    #[test]
    fn test_forced_draw_reaches_top_tier() {
        let sim = reference_simulator();
        let gain = sim.outcome_for_draw(&reference_allocation(), 0.05).unwrap();
        // 1000 * (0.5*10 + 0.3*20 + 0.2*30) * 0.75 = 1000 * 17 * 0.75
        assert!((gain - 12_750.0).abs() < 1e-9);
    }

    #[test]
    fn test_net_gain_per_tier() {
        let sim = reference_simulator();
        let allocation = reference_allocation();

        assert!((sim.net_gain(&allocation, 0).unwrap() - 3_750.0).abs() < 1e-9);
        assert!((sim.net_gain(&allocation, 1).unwrap() - 8_250.0).abs() < 1e-9);
        assert!((sim.net_gain(&allocation, 2).unwrap() - 12_750.0).abs() < 1e-9);
    }

    #[test]
    fn test_cost_basis_reduces_gain() {
        let ladder = PriceLadder::new(&[10.0, 20.0], &[1.0, 0.5]).unwrap();
        let sim = OutcomeSimulator::new(ladder, 100.0, 5.0, 0.0).unwrap();
        let allocation = Allocation::new(vec![0.5, 0.5]);

        // 100 * (0.5 * 5 + 0.5 * 15)
        assert!((sim.net_gain(&allocation, 1).unwrap() - 1_000.0).abs() < 1e-9);
        // Selling below basis books a loss.
        let sim = OutcomeSimulator::new(sim.ladder().clone(), 100.0, 12.0, 0.0).unwrap();
        assert!(sim.net_gain(&allocation, 0).unwrap() < 0.0);
    }

    #[test]
    fn test_simulate_once_stays_in_outcome_set() {
        let sim = reference_simulator();
        let allocation = reference_allocation();
        let outcomes = [3_750.0, 8_250.0, 12_750.0];

        let mut rng = draw_rng(1, 1, 0);
        for _ in 0..200 {
            let gain = sim.simulate_once(&allocation, &mut rng).unwrap();
            assert!(outcomes.iter().any(|o| (o - gain).abs() < 1e-9));
        }
    }

    #[test]
    fn test_sample_parallel_matches_sequential() {
        let sim = reference_simulator();
        let allocation = reference_allocation();

        let sequential = sim.sample(&allocation, 500, 99, 4, false).unwrap();
        let parallel = sim.sample(&allocation, 500, 99, 4, true).unwrap();

        assert_eq!(sequential.len(), 500);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_sample_empty() {
        let sim = reference_simulator();
        assert!(sim
            .sample(&reference_allocation(), 0, 1, 0, true)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_wrong_length_allocation_is_rejected() {
        let sim = reference_simulator();
        let short = Allocation::new(vec![1.0]);
        let long = Allocation::new(vec![0.2, 0.3, 0.5, 9.0]);
        let mut rng = draw_rng(1, 0, 0);

        assert_eq!(
            sim.net_gain(&long, 2).unwrap_err(),
            SaleError::LengthMismatch { expected: 3, actual: 4 }
        );
        assert_eq!(
            sim.outcome_for_draw(&short, 0.05).unwrap_err(),
            SaleError::LengthMismatch { expected: 3, actual: 1 }
        );
        assert!(matches!(
            sim.simulate_once(&short, &mut rng),
            Err(SaleError::LengthMismatch { .. })
        ));
        assert!(matches!(
            sim.sample(&long, 10, 1, 0, true),
            Err(SaleError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_net_gain_rejects_tier_past_ladder() {
        let sim = reference_simulator();
        let allocation = reference_allocation();

        assert_eq!(
            sim.net_gain(&allocation, 3).unwrap_err(),
            SaleError::TierOutOfRange { tier: 3, tiers: 3 }
        );
        assert!(matches!(
            sim.net_gain(&allocation, usize::MAX),
            Err(SaleError::TierOutOfRange { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let ladder = PriceLadder::new(&[10.0], &[1.0]).unwrap();

        assert!(OutcomeSimulator::new(ladder.clone(), 0.0, 0.0, 0.25).is_err());
        assert!(OutcomeSimulator::new(ladder.clone(), 10.0, -1.0, 0.25).is_err());
        assert!(OutcomeSimulator::new(ladder.clone(), 10.0, 0.0, 1.5).is_err());
        assert!(OutcomeSimulator::new(ladder, 10.0, 0.0, f64::NAN).is_err());
    }
}
