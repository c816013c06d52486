//! Allocation optimizer: stochastic hill-climb over sell-through allocations.
//!
//! Each iteration perturbs the best allocation found so far, scores the
//! candidate on a fresh Monte Carlo sample set, and keeps it only when it
//! strictly improves the trimmed-mean gain without taking on unacceptable
//! risk:
//!
//! ```text
//! accept iff trimmed_mean(c) > trimmed_mean(best)
//!        and (std_dev(c) < std_dev(best) or std_dev(c) < risk_ceiling)
//! ```
//!
//! Worse candidates are never accepted, so the best score is non-decreasing
//! over a run. The loop always runs the full iteration budget.
//!
//! ## Baseline
//!
//! The initial allocation is scored first (evaluation 0) and seeds the
//! best-so-far state. A run with zero iterations performs no evaluation at
//! all and reports the initial allocation with a neutral score of zero.

use rand::Rng;
use tracing::{debug, info, trace};

use crate::allocation::Allocation;
use crate::error::{Result, SaleError};
use crate::rng::perturbation_rng;
use crate::simulator::OutcomeSimulator;
use crate::stats::OutcomeStats;

/// Default dispersion below which a candidate is acceptable regardless of
/// whether its risk improved. Same currency units as net gain.
pub const DEFAULT_RISK_CEILING: f64 = 400_000.0;

/// Default share of samples trimmed across both tails.
pub const DEFAULT_TRIM_PROPORTION: f64 = 0.3;

/// Largest accepted `adjustment_number_factor`. Rounds per perturbation are
/// bounded by `tiers` times this value.
pub const MAX_ADJUSTMENT_NUMBER_FACTOR: f64 = 1_000.0;

/// Search parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizerConfig {
    /// Upper bound on the fraction moved in one adjustment round.
    pub adjustment_rate_factor: f64,

    /// Adjustment rounds per perturbation are drawn from
    /// `[0, tiers * adjustment_number_factor)`.
    pub adjustment_number_factor: f64,

    /// Perturb-evaluate-accept iterations.
    pub num_iterations: usize,

    /// Monte Carlo draws per evaluation.
    pub num_simulations: usize,

    /// Share of samples trimmed across both tails for the score.
    pub trim_proportion: f64,

    /// Acceptance ceiling on the sample standard deviation.
    pub risk_ceiling: f64,

    /// Seed for the perturbation and draw streams.
    pub seed: u64,

    /// Run the draws of one evaluation on the rayon pool.
    pub parallel: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            adjustment_rate_factor: 0.1,
            adjustment_number_factor: 1.0,
            num_iterations: 1_000,
            num_simulations: 1_000,
            trim_proportion: DEFAULT_TRIM_PROPORTION,
            risk_ceiling: DEFAULT_RISK_CEILING,
            seed: 42,
            parallel: true,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        let non_negative = |name: &'static str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(SaleError::invalid_parameter(name, value))
            }
        };

        non_negative("adjustment_rate_factor", self.adjustment_rate_factor)?;
        non_negative("adjustment_number_factor", self.adjustment_number_factor)?;
        if self.adjustment_number_factor > MAX_ADJUSTMENT_NUMBER_FACTOR {
            return Err(SaleError::invalid_parameter(
                "adjustment_number_factor",
                self.adjustment_number_factor,
            ));
        }

        if !(0.0..=1.0).contains(&self.trim_proportion) {
            return Err(SaleError::invalid_parameter(
                "trim_proportion",
                self.trim_proportion,
            ));
        }
        // An infinite ceiling is allowed and disables the risk test.
        if self.risk_ceiling.is_nan() || self.risk_ceiling < 0.0 {
            return Err(SaleError::invalid_parameter("risk_ceiling", self.risk_ceiling));
        }

        Ok(())
    }
}

/// Best allocation found so far together with its scored sample set.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredAllocation {
    pub allocation: Allocation,
    pub stats: OutcomeStats,
}

/// Progress information handed to [`AllocationOptimizer::optimize_with`].
#[derive(Debug)]
pub struct IterationReport<'a> {
    /// Zero-based iteration index.
    pub iteration: usize,
    pub accepted: bool,
    pub candidate: &'a OutcomeStats,
    pub best: &'a ScoredAllocation,
}

/// Outcome of a full optimization run.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizationResult {
    /// Best allocation found.
    pub allocation: Allocation,

    /// Trimmed-mean net gain of `allocation`.
    pub score: f64,

    /// Full statistics of `allocation`'s winning sample set.
    pub stats: OutcomeStats,

    /// Statistics of the initial allocation, if it was evaluated.
    pub baseline: Option<OutcomeStats>,

    /// Number of accepted candidates.
    pub accepted: usize,

    /// Iterations actually run.
    pub iterations: usize,
}

/// Drives the perturb-evaluate-accept loop for one position.
#[derive(Clone, Debug)]
pub struct AllocationOptimizer {
    simulator: OutcomeSimulator,
    config: OptimizerConfig,
}

impl AllocationOptimizer {
    pub fn new(simulator: OutcomeSimulator, config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { simulator, config })
    }

    pub fn simulator(&self) -> &OutcomeSimulator {
        &self.simulator
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Propose a candidate derived from `current`.
    ///
    /// Runs `floor(tiers * adjustment_number_factor * U)` rounds. Each round
    /// moves up to `adjustment_rate_factor` from one random tier to another
    /// distinct tier; when the source holds less than the drawn amount a
    /// random share of what it holds moves instead, so no fraction goes
    /// negative. The result is renormalized to sum to one.
    pub fn adjust<R: Rng + ?Sized>(&self, current: &Allocation, rng: &mut R) -> Result<Allocation> {
        self.simulator.check_allocation(current)?;
        let tiers = current.len();
        let mut candidate = current.clone();

        let rounds =
            (tiers as f64 * self.config.adjustment_number_factor * rng.gen::<f64>()).floor() as usize;

        if tiers >= 2 {
            for _ in 0..rounds {
                let from = rng.gen_range(0..tiers);
                let mut to = rng.gen_range(0..tiers - 1);
                if to >= from {
                    to += 1;
                }

                let magnitude = rng.gen::<f64>() * self.config.adjustment_rate_factor;
                let available = candidate.get(from);
                let amount = if available > magnitude {
                    magnitude
                } else {
                    available * rng.gen::<f64>()
                };

                candidate.transfer(from, to, amount);
            }
        }

        candidate.normalize()?;
        Ok(candidate)
    }

    /// Score `allocation` on the sample set of evaluation index `evaluation`.
    ///
    /// Index 0 is reserved for the baseline; iteration `t` uses `t + 1`.
    pub fn evaluate(&self, allocation: &Allocation, evaluation: u64) -> Result<OutcomeStats> {
        let samples = self.simulator.sample(
            allocation,
            self.config.num_simulations,
            self.config.seed,
            evaluation,
            self.config.parallel,
        )?;
        Ok(OutcomeStats::from_samples(&samples, self.config.trim_proportion))
    }

    /// Joint gain/risk acceptance test.
    pub fn accepts(&self, candidate: &OutcomeStats, best: &OutcomeStats) -> bool {
        candidate.trimmed_mean > best.trimmed_mean
            && (candidate.std_dev < best.std_dev || candidate.std_dev < self.config.risk_ceiling)
    }

    /// Run the full search from `initial`.
    pub fn optimize(&self, initial: &Allocation) -> Result<OptimizationResult> {
        self.optimize_with(initial, |_| {})
    }

    /// Run the full search, reporting every iteration to `observer`.
    pub fn optimize_with<F>(&self, initial: &Allocation, mut observer: F) -> Result<OptimizationResult>
    where
        F: FnMut(&IterationReport<'_>),
    {
        initial.validate(self.simulator.tiers())?;

        let config = &self.config;
        info!(
            tiers = self.simulator.tiers(),
            iterations = config.num_iterations,
            simulations = config.num_simulations,
            seed = config.seed,
            "starting allocation search"
        );

        if config.num_iterations == 0 {
            return Ok(OptimizationResult {
                allocation: initial.clone(),
                score: 0.0,
                stats: OutcomeStats::default(),
                baseline: None,
                accepted: 0,
                iterations: 0,
            });
        }

        let mut rng = perturbation_rng(config.seed);
        let baseline = self.evaluate(initial, 0)?;
        debug!(
            score = baseline.trimmed_mean,
            std_dev = baseline.std_dev,
            "baseline evaluated"
        );

        let mut best = ScoredAllocation {
            allocation: initial.clone(),
            stats: baseline,
        };
        let mut accepted = 0;

        for iteration in 0..config.num_iterations {
            let allocation = self.adjust(&best.allocation, &mut rng)?;
            let stats = self.evaluate(&allocation, iteration as u64 + 1)?;
            let accept = self.accepts(&stats, &best.stats);

            if accept {
                debug!(
                    iteration,
                    score = stats.trimmed_mean,
                    std_dev = stats.std_dev,
                    "accepted candidate"
                );
                best = ScoredAllocation { allocation, stats };
                accepted += 1;
            } else {
                trace!(iteration, score = stats.trimmed_mean, "rejected candidate");
            }

            observer(&IterationReport {
                iteration,
                accepted: accept,
                candidate: &stats,
                best: &best,
            });
        }

        info!(
            score = best.stats.trimmed_mean,
            std_dev = best.stats.std_dev,
            accepted,
            "allocation search finished"
        );

        Ok(OptimizationResult {
            score: best.stats.trimmed_mean,
            stats: best.stats,
            allocation: best.allocation,
            baseline: Some(baseline),
            accepted,
            iterations: config.num_iterations,
        })
    }
}
