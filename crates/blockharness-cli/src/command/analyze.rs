use std::path::PathBuf;

use anyhow::Context as _;
use blockharness_engine::Board;
use blockharness_evaluator::{MetricsEngine, PlayerMetrics};

use crate::{
    model::config::HarnessConfig,
    util::{self, Output},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AnalyzeArg {
    /// Board file: one line per row, `#` filled and `.` empty
    board: PathBuf,
    /// Comma-separated shape names currently in the tray
    #[arg(long, value_delimiter = ',')]
    preview: Vec<String>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &AnalyzeArg, config: &HarnessConfig) -> anyhow::Result<()> {
    let AnalyzeArg {
        board,
        preview,
        output,
    } = arg;

    let art = util::read_text_file("board", board)?;
    let board = Board::from_ascii(&art)
        .with_context(|| format!("Invalid board file: {}", board.display()))?;
    let catalog = config.catalog();
    let preview = preview
        .iter()
        .map(|name| catalog.require(name))
        .collect::<Result<Vec<_>, _>>()?;

    log::info!(
        "analyzing {}x{} board with {} filled cell(s)",
        board.rows(),
        board.cols(),
        board.filled_count()
    );
    let engine = MetricsEngine::new(config.metrics);
    let snapshot = engine.snapshot(&board, &catalog, &preview, &PlayerMetrics::new());
    Output::save_json(&snapshot.report(&catalog), output.clone())?;
    Ok(())
}
