use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use jiff::civil::Date;
use nestegg::{RunOptions, init_logging, load_snapshot, prepare_parameters, write_report};
use nestegg_core::{MonteCarloProgress, simulate_with_progress};

#[derive(Parser, Debug)]
#[command(name = "nestegg")]
#[command(about = "Monte Carlo retirement success and safe withdrawal rate")]
struct Args {
    /// Household snapshot (YAML)
    snapshot: PathBuf,

    /// Number of Monte Carlo trials
    #[arg(short, long)]
    trials: Option<usize>,

    /// Master seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Date ages are computed on (default: today)
    #[arg(long)]
    as_of: Option<Date>,

    /// Initial withdrawal rate, e.g. 0.04
    #[arg(long)]
    withdrawal_rate: Option<f64>,

    /// Success probability the safe withdrawal rate must reach
    #[arg(long)]
    target: Option<f64>,

    /// Skip the safe withdrawal rate search
    #[arg(long)]
    no_calibrate: bool,

    /// Drive returns with the four-state market regime model
    #[arg(long)]
    regimes: bool,

    /// Give up after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Rows of the first trial's trace to print
    #[arg(long, default_value_t = 10)]
    trace_rows: usize,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(args.log_file.as_deref(), &args.log_level)?;

    let snapshot = load_snapshot(&args.snapshot)?;
    let as_of = args.as_of.unwrap_or_else(|| jiff::Zoned::now().date());
    let options = RunOptions {
        trials: args.trials,
        seed: args.seed,
        target_success: args.target,
        withdrawal_rate: args.withdrawal_rate,
        calibrate: !args.no_calibrate,
        regimes: args.regimes,
    };
    let params = prepare_parameters(&snapshot, as_of, &options)?;

    let mut progress = MonteCarloProgress::new();
    if let Some(secs) = args.timeout {
        progress = progress.with_timeout(Duration::from_secs(secs));
    }

    tracing::info!(
        snapshot = %args.snapshot.display(),
        %as_of,
        trials = params.monte_carlo.trials,
        "starting simulation"
    );
    let result = simulate_with_progress(&params, &progress).wrap_err("simulation failed")?;
    tracing::info!(
        trials_run = progress.completed(),
        success = result.probability_of_success,
        "simulation finished"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let mut text = String::new();
        write_report(&mut text, &result, args.trace_rows)?;
        print!("{text}");
    }
    Ok(())
}
