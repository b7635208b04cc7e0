//! YieldPool CLI — run, validate, and quote pool scenarios.
//!
//! Commands:
//! - `run` — execute one or more scenario files and save their reports
//! - `validate` — parse scenarios and build their pools without running steps
//! - `quote` — run a scenario and print the resulting exchange rate

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use yieldpool_core::build_pool;
use yieldpool_runner::{run_file, run_files, save_report, ScenarioConfig, ScenarioReport};

#[derive(Parser)]
#[command(
    name = "yieldpool",
    about = "YieldPool CLI — pooled-capital allocator scenarios"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute scenario files and write JSON / CSV / Markdown reports.
    Run {
        /// Scenario TOML files.
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,

        /// Output directory for report artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary only; write nothing.
        #[arg(long, default_value_t = false)]
        no_save: bool,

        /// Print the full report as JSON to stdout.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Parse scenario files and build their pools without running any step.
    Validate {
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,
    },
    /// Run a scenario and print the exchange rate it ends at.
    Quote {
        scenario: PathBuf,

        /// Also show how many claim units a deposit of this size would mint.
        #[arg(long)]
        amount: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            scenarios,
            output_dir,
            no_save,
            json,
        } => run_cmd(&scenarios, &output_dir, no_save, json),
        Commands::Validate { scenarios } => validate_cmd(&scenarios),
        Commands::Quote { scenario, amount } => quote_cmd(&scenario, amount),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("yieldpool_cli={level},yieldpool_runner={level},yieldpool_core={level}")
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_cmd(scenarios: &[PathBuf], output_dir: &Path, no_save: bool, json: bool) -> Result<()> {
    let results = run_files(scenarios);
    let mut failed = 0usize;

    for (path, result) in results {
        match result {
            Ok(report) => {
                if json {
                    println!("{}", yieldpool_runner::export_json(&report)?);
                } else {
                    print_summary(&report);
                }
                if !no_save {
                    let paths = save_report(&report, output_dir)?;
                    println!("Artifacts saved to: {}", paths.dir.display());
                }
            }
            Err(err) => {
                failed += 1;
                error!(scenario = %path.display(), "{err:#}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} scenario(s) failed", scenarios.len());
    }
    Ok(())
}

fn validate_cmd(scenarios: &[PathBuf]) -> Result<()> {
    let mut failed = 0usize;
    for path in scenarios {
        match validate_one(path) {
            Ok((name, strategies, steps)) => {
                println!(
                    "ok    {} ({name}: {strategies} strategies, {steps} steps)",
                    path.display()
                );
            }
            Err(err) => {
                failed += 1;
                println!("FAIL  {}: {err:#}", path.display());
            }
        }
    }
    if failed > 0 {
        bail!("{failed} scenario(s) invalid");
    }
    Ok(())
}

fn validate_one(path: &Path) -> Result<(String, usize, usize)> {
    let config = ScenarioConfig::from_file(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    let built = build_pool(&config.pool).context("pool does not build")?;
    info!(scenario = %config.name, "validated");
    Ok((config.name, built.pool.registry().len(), config.steps.len()))
}

fn quote_cmd(scenario: &Path, amount: Option<u64>) -> Result<()> {
    let report = run_file(scenario)?;
    let snap = &report.final_snapshot;
    let rate = snap.rate;

    println!("Scenario:      {}", report.scenario);
    println!("Pool value:    {}", snap.pool_value);
    println!("Claim supply:  {}", snap.total_units);
    if snap.is_bootstrap() {
        println!("Rate:          1 (bootstrap)");
    } else {
        println!(
            "Rate:          {} / {} ({:.6})",
            rate.pool_value,
            rate.total_units,
            rate.as_f64()
        );
    }

    if let Some(amount) = amount {
        let units = rate
            .claim_units_for(u128::from(amount))
            .context("pool cannot accept deposits at this rate")?;
        println!("Deposit {amount} mints {units} claim units");
    }
    Ok(())
}

fn print_summary(report: &ScenarioReport) {
    let s = &report.summary;
    let snap = &report.final_snapshot;
    println!("── {} ──", report.scenario);
    if !report.description.is_empty() {
        println!("{}", report.description);
    }
    println!(
        "Steps: {} ({} rejected as expected), partial withdrawals: {}",
        s.steps, s.rejected, s.partial_withdrawals
    );
    println!(
        "Deposited: {} for {} units, returned: {} for {} units",
        s.deposited, s.units_minted, s.returned, s.units_burned
    );
    println!(
        "Final: value {} / supply {} (rate {:.6})",
        snap.pool_value,
        snap.total_units,
        snap.rate.as_f64()
    );
    for strategy in &snap.strategies {
        println!(
            "  {:>3}  {:<20} weight {:>4}  {:<8}  {}",
            strategy.index.to_string(),
            strategy.name,
            strategy.weight,
            if strategy.enabled { "enabled" } else { "disabled" },
            strategy.valuation
        );
    }
}
