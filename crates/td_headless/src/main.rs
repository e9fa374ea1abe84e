//! Headless tower-defense balance runner.
//!
//! # Usage
//!
//! ```bash
//! # Single run against the built-in data
//! cargo run -p td_headless -- run --waves 10 --seed 7
//!
//! # Use a config directory (also read from TD_SIM_CONFIG_DIR)
//! cargo run -p td_headless -- --config-dir data run --metrics out/run.json
//!
//! # Seed sweep with a tuning report
//! cargo run -p td_headless -- batch --count 500 --output results/
//!
//! # Built-in or RON scenarios
//! cargo run -p td_headless -- scenarios --dir scenarios/
//!
//! # Determinism check
//! cargo run -p td_headless -- verify --runs 5
//!
//! # Validate config files without running
//! cargo run -p td_headless -- --config-dir data validate
//! ```
//!
//! Logs go to stderr; reports go to stdout. The exit code is 1 when a run
//! fails, a scenario misses its expectation, or loading fails.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use td_core::config::SimulationConfig;
use td_headless::{
    analyze_batch, analyze_run, run_batch, run_scenarios, run_simulation_async,
    run_simulation_with_metrics, verify_determinism, BatchConfig, ConfigLocator, DifficultyBand,
    Scenario, SimulationData,
};

/// Ancestor levels probed by `--search-ancestors`.
const ANCESTOR_LEVELS: usize = 3;

#[derive(Parser)]
#[command(name = "td_headless")]
#[command(about = "Headless tower-defense balance simulator")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding buildings.json, enemies.json, placement.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Look for config files in the working directory and its parents
    #[arg(long, global = true, conflicts_with = "config_dir")]
    search_ancestors: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the default config.
#[derive(Args, Debug, Clone)]
struct RunOptions {
    /// Waves to play
    #[arg(short, long)]
    waves: Option<u32>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Starting money
    #[arg(long)]
    money: Option<u32>,

    /// Starting lives
    #[arg(long)]
    lives: Option<u32>,

    /// Authored wave set to use
    #[arg(long)]
    wave_set: Option<String>,

    /// Enemy health multiplier
    #[arg(long)]
    health: Option<f64>,

    /// Building cost multiplier
    #[arg(long)]
    cost: Option<f64>,

    /// Load the config from a scenario file instead
    #[arg(short, long)]
    scenario: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single run
    Run {
        #[command(flatten)]
        options: RunOptions,

        /// Skip pre/post wave delays and demote per-wave logs
        #[arg(long)]
        fast: bool,

        /// Write run metrics as JSON
        #[arg(short, long)]
        metrics: Option<PathBuf>,

        /// Write a markdown tuning report
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Sweep one config over many seeds
    Batch {
        #[command(flatten)]
        options: RunOptions,

        /// Number of runs
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Worker threads (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Play scenarios and check their expectations
    Scenarios {
        /// Directory of RON scenarios (built-in scenarios when omitted)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Verify determinism by running the same config repeatedly
    Verify {
        #[command(flatten)]
        options: RunOptions,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Load and validate config files without running
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs to stderr; stdout is for reports
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let locator = match resolve_locator(&cli) {
        Ok(locator) => locator,
        Err(message) => {
            eprintln!("FATAL: {message}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = match cli.command {
        Commands::Validate => cmd_validate(locator),
        command => match SimulationData::load_or_builtin(locator.as_ref()) {
            Ok(data) => dispatch(command, data),
            Err(e) => Err(format!("Failed to load config: {e}")),
        },
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(message) => {
            tracing::error!("{message}");
            eprintln!("FATAL: {message}");
            ExitCode::FAILURE
        }
    }
}

fn resolve_locator(cli: &Cli) -> Result<Option<ConfigLocator>, String> {
    if let Some(dir) = &cli.config_dir {
        return Ok(Some(ConfigLocator::new(dir)));
    }
    if cli.search_ancestors {
        let cwd = std::env::current_dir()
            .map_err(|e| format!("Cannot read working directory: {e}"))?;
        return Ok(Some(ConfigLocator::with_ancestor_search(cwd, ANCESTOR_LEVELS)));
    }
    Ok(ConfigLocator::from_env())
}

/// `Ok(passed)` for a completed command, `Err` for a fatal error.
fn dispatch(command: Commands, data: SimulationData) -> Result<bool, String> {
    match command {
        Commands::Run {
            options,
            fast,
            metrics,
            report,
        } => {
            let config = build_config(&options)?.with_fast_mode(fast);
            cmd_run(config, data, metrics, report)
        }
        Commands::Batch {
            options,
            count,
            parallel,
            output,
        } => {
            let config = build_config(&options)?.with_fast_mode(true);
            cmd_batch(config, &data, count, parallel, output)
        }
        Commands::Scenarios { dir } => cmd_scenarios(&data, dir),
        Commands::Verify { options, runs } => {
            let config = build_config(&options)?.with_fast_mode(true);
            Ok(cmd_verify(&config, &data, runs))
        }
        Commands::Validate => Ok(true),
    }
}

fn build_config(options: &RunOptions) -> Result<SimulationConfig, String> {
    let mut config = match &options.scenario {
        Some(path) => {
            Scenario::load(path)
                .map_err(|e| format!("Failed to load scenario: {e}"))?
                .config
        }
        None => SimulationConfig::default(),
    };
    if let Some(waves) = options.waves {
        config = config.with_max_waves(waves);
    }
    if let Some(seed) = options.seed {
        config = config.with_seed(seed);
    }
    if let Some(money) = options.money {
        config = config.with_starting_money(money);
    }
    if let Some(lives) = options.lives {
        config = config.with_starting_lives(lives);
    }
    if let Some(id) = &options.wave_set {
        config = config.with_wave_set(id.clone());
    }
    if let Some(health) = options.health {
        config = config.with_enemy_health_multiplier(health);
    }
    if let Some(cost) = options.cost {
        config = config.with_building_cost_multiplier(cost);
    }
    Ok(config)
}

/// Play a single run on the blocking pool
fn cmd_run(
    config: SimulationConfig,
    data: SimulationData,
    metrics_path: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> Result<bool, String> {
    let wants_metrics = metrics_path.is_some() || report_path.is_some();
    let (result, metrics) = if wants_metrics {
        let (result, metrics) = run_simulation_with_metrics(&config, &data, "run");
        (result, Some(metrics))
    } else {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("Failed to start runtime: {e}"))?;
        let result = runtime.block_on(run_simulation_async(config, Arc::new(data)));
        (result, None)
    };

    println!("{}", result.summary());
    for wave in &result.wave_results {
        eprintln!(
            "  Wave {:>2}: {:>3} spawned, {:>3} killed, {:>3} leaked, +{} money, -{} spent",
            wave.wave_number,
            wave.enemies_spawned,
            wave.enemies_killed,
            wave.enemies_leaked,
            wave.money_earned,
            wave.money_spent
        );
    }

    if let Some(metrics) = metrics {
        if let Some(path) = metrics_path {
            metrics
                .export(&path)
                .map_err(|e| format!("Failed to export metrics: {e}"))?;
            eprintln!("Metrics saved to: {}", path.display());
        }
        if let Some(path) = report_path {
            let report = analyze_run(&metrics, DifficultyBand::default()).to_markdown();
            std::fs::write(&path, report).map_err(|e| format!("Failed to write report: {e}"))?;
            eprintln!("Report saved to: {}", path.display());
        }
    }

    Ok(result.success)
}

/// Sweep seeds and save results plus a tuning report
fn cmd_batch(
    base: SimulationConfig,
    data: &SimulationData,
    count: u32,
    parallel: u32,
    output: PathBuf,
) -> Result<bool, String> {
    let seed = base.random_seed;
    let config = BatchConfig::new(base, count)
        .with_seed(seed)
        .with_parallelism(parallel);
    let results = run_batch(config, data).map_err(|e| format!("Batch failed: {e}"))?;

    let results_path = output.join("batch_results.json");
    results
        .save(&results_path)
        .map_err(|e| format!("Failed to save results: {e}"))?;

    let analysis = analyze_batch(&results, DifficultyBand::default());
    let report_path = output.join("tuning_report.md");
    std::fs::write(&report_path, analysis.to_markdown())
        .map_err(|e| format!("Failed to write report: {e}"))?;

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Runs: {}", summary.total_runs);
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!("Victory rate: {:.1}%", summary.victory_rate * 100.0);
    eprintln!("Avg waves completed: {:.2}", summary.avg_waves_completed);
    eprintln!("Avg balance score: {:.3}", summary.avg_balance_score);
    for issue in analysis.issues_by_severity().iter().take(3) {
        eprintln!("  [{:?}] {}: {:.2}", issue.severity, issue.category, issue.value);
    }
    eprintln!("\nResults saved to: {}", results_path.display());
    eprintln!("Report saved to: {}", report_path.display());

    Ok(true)
}

/// Play scenarios sequentially
fn cmd_scenarios(data: &SimulationData, dir: Option<PathBuf>) -> Result<bool, String> {
    let scenarios = match dir {
        Some(dir) => Scenario::load_dir(&dir).map_err(|e| format!("Failed to load scenarios: {e}"))?,
        None => Scenario::builtin(),
    };

    let outcomes = run_scenarios(data, &scenarios);
    let mut all_passed = true;
    for outcome in &outcomes {
        if outcome.passed() {
            println!("PASS {}: {}", outcome.name, outcome.result.summary());
        } else {
            all_passed = false;
            println!("FAIL {}: {}", outcome.name, outcome.result.summary());
            for mismatch in &outcome.mismatches {
                println!("     - {mismatch}");
            }
        }
    }
    Ok(all_passed)
}

/// Replay the same config and compare fingerprints
fn cmd_verify(config: &SimulationConfig, data: &SimulationData, runs: u32) -> bool {
    let report = verify_determinism(config, data, runs);
    if report.deterministic {
        println!("PASS: {runs} runs produced identical outcomes");
    } else {
        println!("FAIL: runs diverged");
        for (i, fingerprint) in report.fingerprints.iter().enumerate() {
            println!("  Run {}: {fingerprint:016x}", i + 1);
        }
    }
    report.deterministic
}

/// Load every config file and report what was found
fn cmd_validate(locator: Option<ConfigLocator>) -> Result<bool, String> {
    let Some(locator) = locator else {
        return Err("No config directory given (use --config-dir or TD_SIM_CONFIG_DIR)".to_string());
    };
    match SimulationData::load(&locator) {
        Ok(data) => {
            println!(
                "OK: {} building types, {} enemy types, {} initial positions, {} wave sets",
                data.buildings.len(),
                data.enemies.keys().count(),
                data.placement.strategies.initial_wave.positions.len(),
                data.wave_sets.len()
            );
            Ok(true)
        }
        Err(e) => {
            println!("INVALID: {e}");
            Ok(false)
        }
    }
}
