use std::path::PathBuf;

use blockharness_dda::TraySeed;
use clap::{Parser, Subcommand};
use flexi_logger::{AdaptiveFormat, Logger, WriteMode};
use rand::Rng as _;

use crate::model::config::HarnessConfig;

use self::{analyze::AnalyzeArg, simulate::SimulateArg};

mod analyze;
mod simulate;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Configuration file (JSON); built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Tray generator seed as 32 hex digits; random when omitted
    #[arg(long, global = true)]
    seed: Option<TraySeed>,
    /// Log filter, e.g. `info` or `blockharness_dda=debug`
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Play automated games and report per-game statistics
    Simulate(#[clap(flatten)] SimulateArg),
    /// Evaluate a single board and print its metrics
    Analyze(#[clap(flatten)] AnalyzeArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    let _logger = Logger::try_with_env_or_str(&args.log_level)?
        .write_mode(WriteMode::BufferAndFlush)
        .log_to_stderr()
        .adaptive_format_for_stderr(AdaptiveFormat::Default)
        .start()?;

    let config = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    log::info!("tray seed: {seed}");

    let result = match &args.mode {
        Mode::Simulate(arg) => simulate::run(arg, &config, seed),
        Mode::Analyze(arg) => analyze::run(arg, &config),
    };
    if let Err(err) = &result {
        log::error!("{err:#}");
    }
    result
}
