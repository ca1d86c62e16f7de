//! # On-board TCS replay
//!
//! Loads a unit config directory (`tcs.toml` and its TVM decoding table),
//! replays a scenario file through the supervisor and reports the outcome.
//! With `--trace` every tick is written to stdout as one JSON line.

use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use tcs_common::tcs::error::EmergencyCause;
use tcs_onboard::config::load_config;
use tcs_onboard::scenario::{Scenario, ScenarioRunner};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// On-board train-protection supervisor, scenario replay
#[derive(Parser, Debug)]
#[command(name = "tcs_onboard")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Replay a track scenario through the on-board train-protection supervisor")]
struct Args {
    /// Config directory holding tcs.toml and the optional TVM decoding table.
    #[arg(long, value_name = "DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Scenario file to replay.
    #[arg(long, value_name = "FILE")]
    scenario: PathBuf,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,

    /// Write one JSON line per tick to stdout.
    #[arg(long)]
    trace: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("TCS on-board v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    info!("Loading config from {}", args.config_dir.display());
    let loaded = load_config(&args.config_dir)?;
    info!(
        "Config OK: unit={}, tvm={:?}, table entries={}",
        loaded.tcs.shared.service_name,
        loaded.tcs.general.tvm,
        loaded.tvm_table.len(),
    );

    let scenario = Scenario::load(&args.scenario)?;
    info!(
        "Scenario {}: {} signals, {:.1} s",
        args.scenario.display(),
        scenario.signals.len(),
        scenario.run.duration_s,
    );

    let mut runner = ScenarioRunner::new(scenario, &loaded);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    while let Some(record) = runner.step() {
        if args.trace {
            serde_json::to_writer(&mut out, &record)?;
            writeln!(out)?;
        }
    }

    let stats = runner.stats();
    info!(
        "Replay done: ticks={}, simulated={:.1}s, emergency applications={}",
        stats.ticks, stats.simulated_s, stats.emergency_applications,
    );
    for (name, cause) in EmergencyCause::all().iter_names() {
        let count = stats.cause_count(cause);
        if count > 0 {
            info!("  {name}: raised {count} time(s)");
        }
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
///
/// Logs go to stderr so `--trace` output stays machine-readable.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}
