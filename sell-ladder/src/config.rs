//! Scenario files.
//!
//! A scenario is a TOML file describing the price ladder, the position being
//! sold and, optionally, the search parameters:
//!
//! ```toml
//! [ladder]
//! prices = [10.0, 20.0, 30.0]
//! probabilities = [1.0, 0.8, 0.3]
//!
//! [position]
//! total_tokens = 1000.0
//! allocation = [0.5, 0.3, 0.2]   # omitted = equal split
//! cost_basis = 0.0
//! capital_gains_rate = 0.25
//!
//! [optimizer]
//! num_iterations = 1000
//! num_simulations = 1000
//! risk_ceiling = 400000.0
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::allocation::Allocation;
use crate::ladder::PriceLadder;
use crate::optimizer::{
    AllocationOptimizer, OptimizerConfig, DEFAULT_RISK_CEILING, DEFAULT_TRIM_PROPORTION,
};
use crate::simulator::OutcomeSimulator;

/// Top-level scenario file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    pub ladder: LadderConfig,
    pub position: PositionConfig,
    #[serde(default)]
    pub optimizer: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LadderConfig {
    /// Sale price per tier, lowest tier first
    pub prices: Vec<f64>,
    /// Probability threshold per tier, same length as `prices`
    pub probabilities: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionConfig {
    /// Tokens held
    pub total_tokens: f64,

    /// Initial sell-through fractions; defaults to an equal split
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<Vec<f64>>,

    /// Acquisition cost per token
    #[serde(default)]
    pub cost_basis: f64,

    /// Tax rate applied to realized gains
    #[serde(default = "default_capital_gains_rate")]
    pub capital_gains_rate: f64,
}

fn default_capital_gains_rate() -> f64 {
    0.25
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "default_adjustment_rate_factor")]
    pub adjustment_rate_factor: f64,

    #[serde(default = "default_adjustment_number_factor")]
    pub adjustment_number_factor: f64,

    #[serde(default = "default_num_iterations")]
    pub num_iterations: usize,

    #[serde(default = "default_num_simulations")]
    pub num_simulations: usize,

    /// Share of samples trimmed across both tails
    #[serde(default = "default_trim_proportion")]
    pub trim_proportion: f64,

    /// Standard deviation below which higher risk is still acceptable
    #[serde(default = "default_risk_ceiling")]
    pub risk_ceiling: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Spread the draws of each evaluation across threads
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_adjustment_rate_factor() -> f64 {
    0.1
}

fn default_adjustment_number_factor() -> f64 {
    1.0
}

fn default_num_iterations() -> usize {
    1_000
}

fn default_num_simulations() -> usize {
    1_000
}

fn default_trim_proportion() -> f64 {
    DEFAULT_TRIM_PROPORTION
}

fn default_risk_ceiling() -> f64 {
    DEFAULT_RISK_CEILING
}

fn default_seed() -> u64 {
    42
}

fn default_parallel() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            adjustment_rate_factor: default_adjustment_rate_factor(),
            adjustment_number_factor: default_adjustment_number_factor(),
            num_iterations: default_num_iterations(),
            num_simulations: default_num_simulations(),
            trim_proportion: default_trim_proportion(),
            risk_ceiling: default_risk_ceiling(),
            seed: default_seed(),
            parallel: default_parallel(),
        }
    }
}

impl From<&SearchConfig> for OptimizerConfig {
    fn from(search: &SearchConfig) -> Self {
        Self {
            adjustment_rate_factor: search.adjustment_rate_factor,
            adjustment_number_factor: search.adjustment_number_factor,
            num_iterations: search.num_iterations,
            num_simulations: search.num_simulations,
            trim_proportion: search.trim_proportion,
            risk_ceiling: search.risk_ceiling,
            seed: search.seed,
            parallel: search.parallel,
        }
    }
}

impl Default for ScenarioConfig {
    /// Three-tier reference scenario.
    fn default() -> Self {
        Self {
            ladder: LadderConfig {
                prices: vec![10.0, 20.0, 30.0],
                probabilities: vec![1.0, 0.8, 0.3],
            },
            position: PositionConfig {
                total_tokens: 1_000.0,
                allocation: Some(vec![0.5, 0.3, 0.2]),
                cost_basis: 0.0,
                capital_gains_rate: default_capital_gains_rate(),
            },
            optimizer: SearchConfig::default(),
        }
    }
}

/// Validated, ready-to-run scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub optimizer: AllocationOptimizer,
    pub allocation: Allocation,
}

impl ScenarioConfig {
    /// Load a scenario from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario from {}", path.display()))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse scenario from {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize scenario")
    }

    /// Save scenario to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("Failed to write scenario to {}", path.display()))
    }

    /// Validate every section and assemble the optimizer.
    pub fn build(&self) -> Result<Scenario> {
        let ladder = PriceLadder::new(&self.ladder.prices, &self.ladder.probabilities)
            .context("Invalid price ladder")?;
        let tiers = ladder.len();

        let simulator = OutcomeSimulator::new(
            ladder,
            self.position.total_tokens,
            self.position.cost_basis,
            self.position.capital_gains_rate,
        )
        .context("Invalid position")?;

        let allocation = match &self.position.allocation {
            Some(fractions) => Allocation::validated(fractions.clone(), tiers)
                .context("Invalid initial allocation")?,
            None => Allocation::uniform(tiers),
        };

        let optimizer = AllocationOptimizer::new(simulator, OptimizerConfig::from(&self.optimizer))
            .context("Invalid optimizer settings")?;

        Ok(Scenario {
            optimizer,
            allocation,
        })
    }
}
