use std::{path::PathBuf, time::Instant};

use anyhow::Context as _;
use blockharness_dda::{DdaAlgorithm, TraySeed};
use blockharness_evaluator::greedy::{
    EdgeHuggingPlayer, GreedyPlayer, Player, PlayerKind, RandomPlayer,
};
use chrono::{DateTime, Utc};
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::{
    model::{config::HarnessConfig, session::GameSession},
    util::Output,
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SimulateArg {
    /// Number of games to play
    #[arg(long, default_value_t = 10)]
    runs: usize,
    /// Maximum number of placements per game
    #[arg(long, default_value_t = 1000)]
    turn_limit: usize,
    /// Automated player (`greedy`, `random` or `edgehugging`)
    #[arg(long, default_value = "greedy")]
    player: PlayerKind,
    /// Tray algorithm, overriding the configuration file
    /// (`static`, `threshold`, `interval`, `metrics` or `opportunity`)
    #[arg(long)]
    dda: Option<DdaAlgorithm>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
struct SimulationReport {
    seed: TraySeed,
    player: String,
    dda: DdaAlgorithm,
    turn_limit: usize,
    mean_score: f64,
    runs: Vec<RunStats>,
}

#[derive(Debug, Clone, Serialize)]
struct RunStats {
    run: usize,
    seed: TraySeed,
    dda: DdaAlgorithm,
    finished_at: DateTime<Utc>,
    score: usize,
    lines_cleared: usize,
    blocks_placed: usize,
    mistakes: usize,
    trays: usize,
    helper_trays: usize,
    killer_trays: usize,
    game_over: bool,
    final_clear_rate: f64,
}

impl RunStats {
    fn new(run: usize, seed: TraySeed, session: &GameSession) -> Self {
        let stats = session.stats();
        let trays = session.tray_counts();
        Self {
            run,
            seed,
            dda: session.tray_config().algorithm,
            finished_at: Utc::now(),
            score: stats.score(),
            lines_cleared: stats.total_cleared_lines(),
            blocks_placed: stats.blocks_placed(),
            mistakes: session.player().mistake_count(),
            trays: trays.total(),
            helper_trays: trays.helper,
            killer_trays: trays.killer,
            game_over: session.is_game_over(),
            final_clear_rate: session.player().clear_rate(),
        }
    }
}

pub(crate) fn run(arg: &SimulateArg, config: &HarnessConfig, seed: TraySeed) -> anyhow::Result<()> {
    let SimulateArg {
        runs,
        turn_limit,
        player,
        dda,
        output,
    } = arg;

    let mut config = config.clone();
    if let Some(dda) = dda {
        config.dda.algorithm = *dda;
    }
    config.validate()?;
    log::info!("tray algorithm: {}", config.dda.algorithm);

    let mut master = Pcg32::from_seed(seed.to_bytes());
    let mut results = Vec::with_capacity(*runs);
    for run in 0..*runs {
        let run_seed: TraySeed = master.random();
        let mut session = config.new_session(run_seed)?;
        let mut ai: Box<dyn Player> = match player {
            PlayerKind::Greedy => Box::new(GreedyPlayer),
            PlayerKind::Random => Box::new(RandomPlayer::new(Pcg32::from_rng(&mut master))),
            PlayerKind::EdgeHugging => Box::new(EdgeHuggingPlayer),
        };
        play_game(&mut session, ai.as_mut(), *turn_limit)
            .with_context(|| format!("Run #{run} (seed {run_seed}) failed"))?;

        let stats = RunStats::new(run, run_seed, &session);
        log::info!(
            "run #{run}: score {}, {} line(s), {} block(s), {} helper / {} killer of {} tray(s){}",
            stats.score,
            stats.lines_cleared,
            stats.blocks_placed,
            stats.helper_trays,
            stats.killer_trays,
            stats.trays,
            if stats.game_over { ", game over" } else { "" }
        );
        results.push(stats);
    }

    #[expect(clippy::cast_precision_loss)]
    let mean_score = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|r| r.score as f64).sum::<f64>() / results.len() as f64
    };
    log::info!("{runs} run(s) finished, mean score {mean_score:.1}");

    let report = SimulationReport {
        seed,
        player: format!("{player:?}").to_lowercase(),
        dda: config.dda.algorithm,
        turn_limit: *turn_limit,
        mean_score,
        runs: results,
    };
    Output::save_json(&report, output.clone())?;
    Ok(())
}

fn play_game(
    session: &mut GameSession,
    player: &mut dyn Player,
    turn_limit: usize,
) -> anyhow::Result<()> {
    for _ in 0..turn_limit {
        if session.is_game_over() {
            break;
        }
        let started = Instant::now();
        let Some(mv) = player.choose_move(session.board(), session.catalog(), session.preview())
        else {
            break;
        };
        session.try_place(mv.preview_index, mv.position, started.elapsed())?;
    }
    Ok(())
}
