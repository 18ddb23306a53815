//! intralab CLI: intraday mean-reversion research pipeline.
//!
//! Commands:
//! - `resample`: 1-minute bar file to 3-minute (or N-minute) bar file
//! - `universe`: rank raw files by turnover and range, write the universe file
//! - `signals`: mean-reversion signals for each universe symbol
//! - `backtest`: backtest every universe symbol, write equity curves and summary
//! - `tune`: window/threshold grid search per symbol, persist the winners
//! - `report`: reprint the summary of a previous backtest

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use intralab_core::SymbolMetrics;
use intralab_runner::{
    build_universe, generate_signals, load_summary_json, load_universe, resample_file,
    run_universe, save_backtest_artifacts, save_tuning_results, BarStore, ModelStore,
    RunnerConfig, TuningSweep, UniverseRun,
};

/// Environment variable holding a tracing filter; overrides `--log-level`.
const LOG_ENV: &str = "INTRALAB_LOG";

#[derive(Parser)]
#[command(
    name = "intralab",
    about = "intralab CLI: intraday mean-reversion backtesting pipeline"
)]
struct Cli {
    /// Runner config (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `intralab_runner=debug`.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resample a 1-minute bar CSV into wider buckets.
    Resample {
        /// Input bar file.
        #[arg(long)]
        input: PathBuf,

        /// Output bar file.
        #[arg(long)]
        output: PathBuf,

        /// Bucket width in minutes.
        #[arg(long, default_value_t = 3)]
        minutes: u32,
    },
    /// Rank raw files and write the universe file.
    Universe {
        /// Number of symbols to keep. Defaults to `[universe] top_n`.
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Compute mean-reversion signals for every universe symbol.
    Signals {
        /// Prefer each symbol's saved (tuned) parameters over `[signal]`.
        #[arg(long, default_value_t = false)]
        use_saved: bool,
    },
    /// Backtest every universe symbol's signal file.
    Backtest {
        /// Shares per position.
        #[arg(long)]
        qty: Option<u32>,

        /// Capital the daily stop is sized from.
        #[arg(long)]
        capital: Option<f64>,

        /// Daily stop as a fraction of capital.
        #[arg(long)]
        daily_stop: Option<f64>,

        /// Transaction cost in basis points per position change.
        #[arg(long)]
        tcost_bps: Option<f64>,

        /// Output directory. Defaults to `{processed_dir}/equity_curves`.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Run symbols one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Print the per-symbol metrics as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Grid-search window and threshold per universe symbol.
    Tune {
        /// Evaluate grid points one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Print the summary saved by a previous `backtest`.
    Report {
        /// Directory holding `summary.json`. Defaults to `{processed_dir}/equity_curves`.
        #[arg(long)]
        input_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format)?;

    let config = RunnerConfig::load(cli.config.as_deref()).context("failed to load config")?;
    tracing::debug!(path = ?cli.config, ?config, "config loaded");

    match cli.command {
        Commands::Resample {
            input,
            output,
            minutes,
        } => run_resample(&input, &output, minutes),
        Commands::Universe { top_n } => run_universe_cmd(&config, top_n),
        Commands::Signals { use_saved } => run_signals(&config, use_saved),
        Commands::Backtest {
            qty,
            capital,
            daily_stop,
            tcost_bps,
            output_dir,
            sequential,
            json,
        } => {
            let mut config = config;
            if let Some(q) = qty {
                config.backtest.qty_per_trade = q;
            }
            if let Some(c) = capital {
                config.backtest.capital = c;
            }
            if let Some(f) = daily_stop {
                config.backtest.daily_stop_fraction = f;
            }
            if let Some(b) = tcost_bps {
                config.backtest.transaction_cost_bps = b;
            }
            config.validate().context("invalid backtest flags")?;
            let out = output_dir.unwrap_or_else(|| config.paths.equity_dir());
            run_backtest_cmd(&config, &out, !sequential, json)
        }
        Commands::Tune { sequential } => run_tune(&config, !sequential),
        Commands::Report { input_dir } => {
            let dir = input_dir.unwrap_or_else(|| config.paths.equity_dir());
            run_report(&dir)
        }
    }
}

fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&filter)
        .map_err(|e| anyhow!("invalid log filter '{filter}': {e}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    Ok(())
}

fn store(config: &RunnerConfig) -> BarStore {
    BarStore::new(&config.paths.raw_dir, &config.paths.processed_dir)
}

fn universe_symbols(config: &RunnerConfig) -> Result<Vec<String>> {
    let path = &config.paths.universe_file;
    if !path.exists() {
        bail!(
            "{} not found; run `intralab universe` first",
            path.display()
        );
    }
    Ok(load_universe(path)?)
}

fn run_resample(input: &Path, output: &Path, minutes: u32) -> Result<()> {
    let rows = resample_file(input, output, minutes)
        .with_context(|| format!("failed to resample {}", input.display()))?;
    println!("{} -> {} ({rows} bars)", input.display(), output.display());
    Ok(())
}

fn run_universe_cmd(config: &RunnerConfig, top_n: Option<usize>) -> Result<()> {
    let top_n = top_n.unwrap_or(config.universe.top_n);
    if top_n == 0 {
        bail!("--top-n must be >= 1");
    }
    let ranked = build_universe(&store(config), top_n, &config.paths.universe_file)?;
    if ranked.is_empty() {
        println!(
            "No raw data found in {}. Fetch bars first.",
            config.paths.raw_dir.display()
        );
        return Ok(());
    }

    println!("{:<12} {:>18} {:>10}", "symbol", "turnover", "range_pct");
    for e in &ranked {
        println!("{:<12} {:>18.2} {:>10.3}", e.symbol, e.turnover, e.range_pct);
    }
    println!("\nWrote {}", config.paths.universe_file.display());
    Ok(())
}

fn run_signals(config: &RunnerConfig, use_saved: bool) -> Result<()> {
    let symbols = universe_symbols(config)?;
    let models = ModelStore::new(&config.paths.model_dir);
    let run = generate_signals(&symbols, &store(config), &models, &config.signal, use_saved)?;

    for (symbol, rows, path) in &run.written {
        println!("{symbol}: {rows} signal rows -> {}", path.display());
    }
    if run.written.is_empty() {
        println!("Nothing produced.");
    }
    Ok(())
}

fn run_backtest_cmd(config: &RunnerConfig, out: &Path, parallel: bool, json: bool) -> Result<()> {
    let symbols = universe_symbols(config)?;
    let run = run_universe(&symbols, &store(config), &config.backtest, parallel)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run.metrics())?);
    } else {
        print_summary(&run);
    }

    match save_backtest_artifacts(&run, out)? {
        Some(path) => println!("\nWrote {}", path.display()),
        None => println!("Nothing to report."),
    }
    Ok(())
}

fn run_tune(config: &RunnerConfig, parallel: bool) -> Result<()> {
    let symbols = universe_symbols(config)?;
    let models = ModelStore::new(&config.paths.model_dir);
    let sweep = TuningSweep::new(config.tuning.clone(), config.backtest).with_parallelism(parallel);
    let run = sweep.tune_universe(&symbols, &store(config), Some(&models))?;

    for t in &run.symbols {
        if let Some(best) = t.best_row() {
            println!(
                "{}: best win={} z={} net_pnl={} sharpe={}",
                t.symbol, best.win, best.z, best.net_pnl, best.daily_sharpe
            );
        }
    }
    if let Some(path) = save_tuning_results(&run.all_rows(), &config.paths.tuning_dir())? {
        println!("\nWrote {}", path.display());
    }
    Ok(())
}

fn run_report(dir: &Path) -> Result<()> {
    let results = load_summary_json(&dir.join("summary.json"))?;
    tracing::debug!(dir = %dir.display(), symbols = results.len(), "summary loaded");
    print_summary(&UniverseRun {
        results,
        skipped: Vec::new(),
    });
    Ok(())
}

fn print_summary(run: &UniverseRun) {
    println!();
    println!("=== Backtest Summary ===");
    println!(
        "{:<12} {:>7} {:>12} {:>8} {:>12} {:>6}",
        "symbol", "trades", "net_pnl", "sharpe", "max_dd", "stops"
    );
    for r in &run.results {
        let m: &SymbolMetrics = &r.metrics;
        println!(
            "{:<12} {:>7} {:>12.2} {:>8.2} {:>12.2} {:>6}",
            m.symbol,
            m.trades,
            m.net_pnl,
            m.daily_sharpe,
            m.max_drawdown,
            r.stops.len()
        );
    }
    for s in &run.skipped {
        println!("WARNING: no signals for {s}");
    }
}
