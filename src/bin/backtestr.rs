//! Backtesting and parameter optimization CLI.

use anyhow::{Context, Result};
use backtestr::application::optimization::reporting::Reporter;
use backtestr::config::{EngineConfig, load_parameter_space};
use backtestr::domain::market::timeframe::Timeframe;
use backtestr::domain::optimization::parameters::{ParameterSet, ParameterSpace};
use backtestr::domain::optimization::types::{FitnessMetric, OptimizationConfig, SearchMethod};
use backtestr::infrastructure::ServiceFactory;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::json;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Strategy backtesting and parameter optimization", long_about = None)]
struct Cli {
    /// Keep results in memory instead of DATABASE_URL
    #[arg(long, global = true)]
    no_persist: bool,

    /// Directory for exported files
    #[arg(long, global = true, default_value = "results")]
    output_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Comma-separated symbols
    #[arg(short, long, default_value = "AAPL")]
    symbols: String,

    /// Start date (YYYY-MM-DD)
    #[arg(long, default_value = "2024-01-01")]
    start: String,

    /// End date (YYYY-MM-DD), inclusive
    #[arg(long, default_value = "2024-06-30")]
    end: String,

    /// Bar interval (1Min, 5Min, 15Min, 1Hour, 4Hour, 1Day)
    #[arg(long, default_value = "1Day")]
    timeframe: String,

    /// Override initial capital
    #[arg(long)]
    capital: Option<String>,

    /// Benchmark symbol for alpha and beta
    #[arg(long)]
    benchmark: Option<String>,

    /// Seed for synthetic data and fallback strategies
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest a single strategy
    Run {
        /// Strategy id
        #[arg(long, default_value = "sma_trend")]
        strategy: String,

        /// Strategy parameters as name=value pairs
        #[arg(short, long, value_delimiter = ',')]
        param: Vec<String>,

        #[command(flatten)]
        common: RunArgs,
    },
    /// Backtest several strategies on the same settings
    Compare {
        /// Comma-separated strategy ids
        #[arg(long, default_value = "always_buy,sma_trend,rsi_reversion")]
        strategies: String,

        /// Write the comparison table to this CSV file
        #[arg(long)]
        csv: Option<String>,

        #[command(flatten)]
        common: RunArgs,
    },
    /// Search a strategy's parameter space
    Optimize {
        #[arg(long, default_value = "sma_trend")]
        strategy: String,

        /// grid, genetic or stochastic
        #[arg(long, default_value = "grid")]
        method: String,

        /// sharpe, returns, calmar or custom
        #[arg(long, default_value = "returns")]
        metric: String,

        /// TOML file mapping parameter names to candidate values
        #[arg(long)]
        space: Option<PathBuf>,

        #[arg(long, default_value = "100")]
        iterations: usize,

        #[arg(long, default_value = "50")]
        population: usize,

        #[arg(long, default_value = "0.1")]
        mutation_rate: f64,

        #[arg(long, default_value = "0.7")]
        crossover_rate: f64,

        /// Number of top steps to display
        #[arg(short, long, default_value = "10")]
        top_n: usize,

        /// Output JSON file for the full result
        #[arg(short, long, default_value = "optimization_results.json")]
        output: String,

        #[command(flatten)]
        common: RunArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env()?;
    let service = ServiceFactory::create_service(&config, !cli.no_persist).await?;
    let reporter = Reporter::new(&cli.output_dir);

    match cli.command {
        Commands::Run {
            strategy,
            param,
            common,
        } => {
            let mut backtest = build_backtest(&config, &strategy, &common)?;
            backtest.parameters = parse_parameters(&param)?;

            reporter.print_header("BACKTEST", &backtest.symbols, &common.start, &common.end);
            let result = service.run_backtest(&backtest).await?;
            reporter.print_backtest(&result);
        }
        Commands::Compare {
            strategies,
            csv,
            common,
        } => {
            let ids = split_list(&strategies);
            let base = build_backtest(&config, "", &common)?;

            reporter.print_header("STRATEGY COMPARISON", &base.symbols, &common.start, &common.end);
            let results = service.compare_strategies(&ids, &base).await?;
            reporter.print_comparison_table(&results);

            if let Some(filename) = csv {
                reporter.export_csv(&results, &filename)?;
            }
        }
        Commands::Optimize {
            strategy,
            method,
            metric,
            space,
            iterations,
            population,
            mutation_rate,
            crossover_rate,
            top_n,
            output,
            common,
        } => {
            let base = build_backtest(&config, &strategy, &common)?;
            let parameter_space = match space {
                Some(path) => {
                    info!("Loading parameter space from: {}", path.display());
                    load_parameter_space(&path)?
                }
                None => default_space(&strategy),
            };

            let mut opt = OptimizationConfig::new(base, parameter_space);
            opt.method = SearchMethod::from_str(&method).map_err(anyhow::Error::msg)?;
            opt.fitness_metric = FitnessMetric::from(metric.as_str());
            opt.max_iterations = iterations;
            opt.population_size = population;
            opt.mutation_rate = mutation_rate;
            opt.crossover_rate = crossover_rate;
            opt.max_concurrency = config.optimization_max_concurrency;

            reporter.print_header(
                &format!("OPTIMIZATION: {} ({})", strategy, opt.method),
                &opt.base.symbols,
                &common.start,
                &common.end,
            );
            let result = service.optimize_algorithm(opt).await?;
            reporter.print_optimization(&result, top_n);
            reporter.export_json(&result, &output)?;
        }
    }

    Ok(())
}

fn build_backtest(
    config: &EngineConfig,
    strategy: &str,
    args: &RunArgs,
) -> Result<backtestr::domain::backtest::BacktestConfig> {
    let start = parse_date(&args.start)?;
    let end = parse_date(&args.end)?;

    let mut backtest = config.backtest_config(strategy, split_list(&args.symbols), start, end);
    backtest.timeframe = Timeframe::from_str(&args.timeframe)?;
    backtest.benchmark = args.benchmark.clone();
    backtest.seed = args.seed;
    if let Some(capital) = &args.capital {
        backtest.initial_capital =
            Decimal::from_str(capital).context(format!("Invalid capital: {}", capital))?;
    }
    Ok(backtest)
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .context(format!("Invalid date format: {}", value))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `name=value` pairs; values are read as JSON, falling back to strings.
fn parse_parameters(pairs: &[String]) -> Result<ParameterSet> {
    let mut params = ParameterSet::new();
    for pair in pairs {
        let (name, raw) = pair
            .split_once('=')
            .context(format!("Parameter must be name=value, got: {}", pair))?;
        let value = serde_json::from_str(raw.trim()).unwrap_or_else(|_| json!(raw.trim()));
        params.insert(name.trim().to_string(), value);
    }
    Ok(params)
}

fn default_space(strategy: &str) -> ParameterSpace {
    let mut space = ParameterSpace::new();
    match strategy {
        "rsi_reversion" => {
            space.insert("period".to_string(), vec![json!(7), json!(14), json!(21)]);
            space.insert("oversold".to_string(), vec![json!(20.0), json!(25.0), json!(30.0)]);
            space.insert("overbought".to_string(), vec![json!(70.0), json!(75.0), json!(80.0)]);
        }
        _ => {
            space.insert(
                "period".to_string(),
                vec![json!(5), json!(10), json!(20), json!(50), json!(100)],
            );
        }
    }
    space
}
