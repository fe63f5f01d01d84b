//! iGain scenario simulator
//!
//! Loads a derivative batch from configuration, deploys it against an
//! in-memory collateral ledger and replays a JSON scenario, printing a JSON
//! summary of every step and the final state.

mod runner;
mod scenario;

use anyhow::{Context, Result};
use clap::Parser;
use runner::Simulation;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "igain-simulator")]
#[command(about = "Replay a scripted scenario against an iGain derivative")]
struct Args {
    /// Derivative configuration file
    #[arg(short, long, default_value = "services/simulator/config/derivative.toml")]
    config: PathBuf,

    /// Environment overlay under `<config dir>/environments/`
    #[arg(short, long)]
    env: Option<String>,

    /// Scenario script (JSON)
    #[arg(short, long)]
    scenario: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    info!(config = %args.config.display(), env = ?args.env, "loading derivative configuration");
    let settings = config::load_settings(&args.config, args.env.as_deref())
        .context("Failed to load derivative configuration")?;

    let scenario = scenario::load_scenario(&args.scenario)?;
    info!(
        scenario = %scenario.name,
        steps = scenario.steps.len(),
        batch = %settings.batch_name,
        kind = %settings.payoff.kind,
        "starting simulation"
    );

    let simulation = Simulation::new(&settings, &scenario)?;
    let summary = simulation.run(&scenario);

    let report = serde_json::to_string_pretty(&summary).context("Failed to encode summary")?;
    println!("{}", report);
    Ok(())
}
