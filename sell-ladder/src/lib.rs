//! Tiered token sell-down optimizer.
//!
//! A holder commits a fraction of a fixed token supply to each rung of a
//! price ladder. Exactly one rung is reached per scenario, and reaching rung
//! `i` sells every tranche `0..=i` at its own price. This crate searches for
//! the allocation that maximizes after-tax gain under that price uncertainty
//! while keeping outcome dispersion in check.
//!
//! ## Components
//!
//! - **Outcome simulator** ([`OutcomeSimulator`]): draws the realized tier
//!   and computes the net gain of one scenario. Stateless; the unit of Monte
//!   Carlo sampling.
//! - **Allocation optimizer** ([`AllocationOptimizer`]): perturbs the best
//!   allocation so far, scores each candidate by the trimmed mean of a
//!   sample set, and accepts it only when the score improves and risk stays
//!   acceptable.
//!
//! ## Example
//!
//! ```
//! use bth_sell_ladder::{Allocation, AllocationOptimizer, OptimizerConfig, OutcomeSimulator, PriceLadder};
//!
//! let ladder = PriceLadder::new(&[10.0, 20.0, 30.0], &[1.0, 0.8, 0.3]).unwrap();
//! let simulator = OutcomeSimulator::new(ladder, 1_000.0, 0.0, 0.25).unwrap();
//! let config = OptimizerConfig { num_iterations: 20, num_simulations: 100, ..Default::default() };
//! let optimizer = AllocationOptimizer::new(simulator, config).unwrap();
//!
//! let result = optimizer.optimize(&Allocation::new(vec![0.5, 0.3, 0.2])).unwrap();
//! assert!((result.allocation.sum() - 1.0).abs() < 1e-9);
//! ```

pub mod allocation;
#[cfg(any(feature = "cli", test))]
pub mod config;
pub mod error;
pub mod ladder;
pub mod optimizer;
pub mod rng;
pub mod simulator;
pub mod stats;

pub use allocation::{Allocation, ALLOCATION_SUM_TOLERANCE};
pub use error::{Result, SaleError};
pub use ladder::{PriceLadder, PriceTier};
pub use optimizer::{
    AllocationOptimizer, IterationReport, OptimizationResult, OptimizerConfig, ScoredAllocation,
    DEFAULT_RISK_CEILING, DEFAULT_TRIM_PROPORTION, MAX_ADJUSTMENT_NUMBER_FACTOR,
};
pub use simulator::OutcomeSimulator;
pub use stats::{sample_std_dev, trimmed_mean, OutcomeStats};
