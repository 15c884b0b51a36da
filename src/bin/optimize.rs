//! Genetic Parameter Optimizer Binary
//!
//! Searches strategy parameters with a genetic algorithm, scoring each candidate by
//! running the configured backtest program.
//!
//! # Usage
//! ```sh
//! BACKTEST_PROGRAM=./run-backtest.sh cargo run --bin optimize -- run --generations 5
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use strategy_optimizer::application::optimization::reporting::SearchReporter;
use strategy_optimizer::application::optimization::search::GeneticSearch;
use strategy_optimizer::application::optimization::termination::GenerationLimit;
use strategy_optimizer::config::OptimizerConfig;
use strategy_optimizer::infrastructure::ProcessBacktestEvaluator;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Genetic Parameter Optimizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the genetic search
    Run {
        /// TOML file with search, parameter and backtest configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Population size (must be even)
        #[arg(short, long)]
        population: Option<usize>,

        /// Number of generations to run
        #[arg(short, long)]
        generations: Option<usize>,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum number of backtests running at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Backtest program to run for each evaluation
        #[arg(short, long)]
        backtest: Option<String>,

        /// Skip the confirmation backtest of each generation's best candidate
        #[arg(long)]
        no_confirm: bool,

        /// Output JSON file for results
        #[arg(short, long, default_value = "optimization_results.json")]
        output: String,
    },
    /// Print the effective configuration as TOML
    Config {
        /// TOML file with search, parameter and backtest configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            population,
            generations,
            seed,
            concurrency,
            backtest,
            no_confirm,
            output,
        } => {
            let mut config = OptimizerConfig::load(config.as_deref())?;
            if let Some(population) = population {
                config.search.population_size = population;
            }
            if let Some(generations) = generations {
                config.search.max_generations = generations;
            }
            if let Some(seed) = seed {
                config.search.seed = Some(seed);
            }
            if let Some(concurrency) = concurrency {
                config.search.concurrency = concurrency;
            }
            if let Some(program) = backtest {
                config.backtest.program = program;
            }
            if no_confirm {
                config.search.confirm_best = false;
            }
            config.validate().context("Invalid optimizer configuration")?;

            let space = config.parameter_space()?;
            let reporter = SearchReporter::default();
            reporter.print_header(
                config.search.population_size,
                config.search.max_generations,
                config.search.seed,
                &output,
            );
            reporter.print_space_info(&space);

            info!("Backtest program: {}", config.backtest.program);
            let evaluator = Arc::new(ProcessBacktestEvaluator::new(config.backtest.clone())?);

            println!("\n🚀 Starting genetic search...");
            reporter.print_table_header();
            let row_reporter = SearchReporter::default();
            let mut search = GeneticSearch::new(
                space,
                config.search.to_settings(),
                evaluator,
                GenerationLimit(config.search.max_generations),
            )?
            .on_generation_complete(move |report| row_reporter.print_generation(report));

            let outcome = search.run().await?;

            reporter.print_best(&outcome);
            reporter.export_json(&outcome, &output)?;
            println!("✅ Optimization complete!\n");
        }
        Commands::Config { config } => {
            let config = OptimizerConfig::load(config.as_deref())?;
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            println!("{}", rendered);
        }
    }

    Ok(())
}
