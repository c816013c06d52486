//! Sell-ladder simulation CLI.
//!
//! Search for the sell-through allocation that maximizes trimmed-mean
//! after-tax gain for a scenario file (or the built-in reference scenario).

#[cfg(feature = "cli")]
mod cli {
    use std::path::PathBuf;

    use anyhow::Result;
    use bth_sell_ladder::{config::ScenarioConfig, Allocation, OptimizationResult, OutcomeStats};
    use clap::{Parser, Subcommand};
    use indicatif::{ProgressBar, ProgressStyle};

    #[derive(Parser)]
    #[command(name = "sell-ladder-sim")]
    #[command(about = "Optimize a tiered token sell-down under price uncertainty")]
    pub struct Cli {
        /// Enable verbose logging
        #[arg(short, long, global = true)]
        pub verbose: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Subcommand)]
    pub enum Command {
        /// Run the allocation search
        Optimize {
            /// Scenario file (default: built-in three-tier scenario)
            #[arg(short, long)]
            config: Option<PathBuf>,

            /// Override the number of search iterations
            #[arg(short, long)]
            iterations: Option<usize>,

            /// Override the number of draws per evaluation
            #[arg(short = 'n', long)]
            simulations: Option<usize>,

            /// Override the random seed
            #[arg(long)]
            seed: Option<u64>,

            /// Override the risk ceiling (std-dev, currency units)
            #[arg(long)]
            risk_ceiling: Option<f64>,

            /// Evaluate draws on a single thread
            #[arg(long)]
            sequential: bool,
        },

        /// Score the scenario's initial allocation without searching
        Evaluate {
            /// Scenario file (default: built-in three-tier scenario)
            #[arg(short, long)]
            config: Option<PathBuf>,

            /// Override the number of draws
            #[arg(short = 'n', long)]
            simulations: Option<usize>,

            /// Override the random seed
            #[arg(long)]
            seed: Option<u64>,
        },

        /// Print the built-in scenario as TOML
        DefaultConfig,
    }

    fn load_scenario(path: Option<&PathBuf>) -> Result<ScenarioConfig> {
        match path {
            Some(path) => ScenarioConfig::load(path),
            None => Ok(ScenarioConfig::default()),
        }
    }

    pub fn run(cli: Cli) -> Result<()> {
        match cli.command {
            Command::Optimize {
                config,
                iterations,
                simulations,
                seed,
                risk_ceiling,
                sequential,
            } => {
                let mut scenario = load_scenario(config.as_ref())?;
                let search = &mut scenario.optimizer;
                if let Some(iterations) = iterations {
                    search.num_iterations = iterations;
                }
                if let Some(simulations) = simulations {
                    search.num_simulations = simulations;
                }
                if let Some(seed) = seed {
                    search.seed = seed;
                }
                if let Some(ceiling) = risk_ceiling {
                    search.risk_ceiling = ceiling;
                }
                if sequential {
                    search.parallel = false;
                }
                run_optimize(&scenario)
            }
            Command::Evaluate {
                config,
                simulations,
                seed,
            } => {
                let mut scenario = load_scenario(config.as_ref())?;
                if let Some(simulations) = simulations {
                    scenario.optimizer.num_simulations = simulations;
                }
                if let Some(seed) = seed {
                    scenario.optimizer.seed = seed;
                }
                run_evaluate(&scenario)
            }
            Command::DefaultConfig => {
                print!("{}", ScenarioConfig::default().to_toml_string()?);
                Ok(())
            }
        }
    }

    fn run_optimize(config: &ScenarioConfig) -> Result<()> {
        let scenario = config.build()?;
        let search = scenario.optimizer.config();

        println!("Sell-Ladder Optimization");
        println!("========================\n");
        println!("Tiers: {}", scenario.optimizer.simulator().tiers());
        println!("Iterations: {}", search.num_iterations);
        println!("Simulations per evaluation: {}", search.num_simulations);
        println!("Risk ceiling: {:.0}", search.risk_ceiling);
        println!("Seed: {}\n", search.seed);

        let progress = ProgressBar::new(search.num_iterations as u64);
        progress.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} iterations  best {msg}")?
                .progress_chars("=>-"),
        );

        let result = scenario.optimizer.optimize_with(&scenario.allocation, |report| {
            progress.inc(1);
            if report.accepted {
                progress.set_message(format!("{:.2}", report.best.stats.trimmed_mean));
            }
        })?;
        progress.finish_and_clear();

        print_allocations(config, &scenario.allocation, &result);
        println!();
        if let Some(baseline) = &result.baseline {
            print_stats("Initial allocation", baseline);
        }
        print_stats("Optimized allocation", &result.stats);
        println!(
            "\nAccepted {} of {} candidates",
            result.accepted, result.iterations
        );

        Ok(())
    }

    fn run_evaluate(config: &ScenarioConfig) -> Result<()> {
        let scenario = config.build()?;
        let stats = scenario.optimizer.evaluate(&scenario.allocation, 0)?;

        println!("Sell-Ladder Evaluation");
        println!("======================\n");
        println!("{:>6} {:>12} {:>12} {:>10}", "Tier", "Price", "Probability", "Fraction");
        println!("{}", "-".repeat(43));
        for (i, (tier, fraction)) in scenario
            .optimizer
            .simulator()
            .ladder()
            .tiers()
            .iter()
            .zip(scenario.allocation.fractions())
            .enumerate()
        {
            println!(
                "{:>6} {:>12.4} {:>12.4} {:>9.2}%",
                i,
                tier.price,
                tier.probability,
                fraction * 100.0
            );
        }
        println!();
        print_stats("Outcome distribution", &stats);

        Ok(())
    }

    fn print_allocations(config: &ScenarioConfig, initial: &Allocation, result: &OptimizationResult) {
        println!(
            "{:>6} {:>12} {:>12} {:>10} {:>10}",
            "Tier", "Price", "Probability", "Initial", "Optimized"
        );
        println!("{}", "-".repeat(54));
        for (i, ((price, probability), (before, after))) in config
            .ladder
            .prices
            .iter()
            .zip(&config.ladder.probabilities)
            .zip(initial.fractions().iter().zip(result.allocation.fractions()))
            .enumerate()
        {
            println!(
                "{:>6} {:>12.4} {:>12.4} {:>9.2}% {:>9.2}%",
                i,
                price,
                probability,
                before * 100.0,
                after * 100.0
            );
        }
    }

    fn print_stats(label: &str, stats: &OutcomeStats) {
        println!("{label}:");
        println!("  Trimmed mean: {:>14.2}", stats.trimmed_mean);
        println!("  Std dev:      {:>14.2}", stats.std_dev);
        println!("  Mean:         {:>14.2}", stats.mean);
        println!("  Median:       {:>14.2}", stats.median);
        println!("  Min / Max:    {:>14.2} / {:.2}", stats.min, stats.max);
        println!("  Samples:      {:>14}", stats.count);
    }
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    use clap::Parser;
    let cli = cli::Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };

    // RUST_LOG overrides the --verbose level.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    cli::run(cli)
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature. Build with:");
    eprintln!("  cargo build -p bth-sell-ladder --features cli --bin sell-ladder-sim");
}
