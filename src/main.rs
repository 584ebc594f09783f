mod config;
mod engine;
mod manager;
mod report;
mod stats;
mod utils;

use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// TOML file overriding the default parameters.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory where the charts are saved.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Seed for the random number generator (random if omitted).
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.config, args.out_dir).context("failed to construct mgr")?;

    mgr.run_simulation(args.seed)?;

    Ok(())
}
