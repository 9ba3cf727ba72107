//! One-shot evaluation of a game position.
//!
//! [`MetricsEngine::snapshot`] combines the board metrics, the best-fit and
//! game-over searches and the player's history into a [`MetricsSnapshot`],
//! which the tray generator reads. [`MetricsSnapshot::report`] turns it into
//! a [`MetricsReport`] with shape names for JSON output.

use std::time::Duration;

use blockharness_engine::{Board, Position, ShapeCatalog, ShapeId};
use serde::{Deserialize, Serialize};

use crate::{
    MetricsConfigError,
    best_fit::{BestFit, compute_best_fit},
    board_metrics::{BoardMetrics, DangerWeights, Phase},
    future::find_game_over_block,
    player::{EmotionalState, MoveRecord, PerfBand, PlayerLevel, PlayerMetrics},
};

/// Thresholds and weights used when taking a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub danger_weights: DangerWeights,
    /// Clear rates strictly below this are "struggling".
    pub low_clear_threshold: f64,
    /// Clear rates strictly above this are "thriving".
    pub high_clear_threshold: f64,
    pub max_time_per_move_secs: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            danger_weights: DangerWeights::default(),
            low_clear_threshold: 0.30,
            high_clear_threshold: 0.70,
            max_time_per_move_secs: 8.0,
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<(), MetricsConfigError> {
        let DangerWeights {
            occupancy,
            fragmentation,
            inv_largest,
        } = self.danger_weights;
        for (name, value) in [
            ("occupancy", occupancy),
            ("fragmentation", fragmentation),
            ("inv_largest", inv_largest),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MetricsConfigError::NegativeWeight { name, value });
            }
        }
        for (name, value) in [
            ("low_clear_threshold", self.low_clear_threshold),
            ("high_clear_threshold", self.high_clear_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MetricsConfigError::ThresholdOutOfRange { name, value });
            }
        }
        if self.low_clear_threshold > self.high_clear_threshold {
            return Err(MetricsConfigError::InvertedThresholds {
                low: self.low_clear_threshold,
                high: self.high_clear_threshold,
            });
        }
        if !self.max_time_per_move_secs.is_finite() || self.max_time_per_move_secs <= 0.0 {
            return Err(MetricsConfigError::InvalidMaxTime {
                value: self.max_time_per_move_secs,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn max_time_per_move(&self) -> Duration {
        Duration::from_secs_f64(self.max_time_per_move_secs)
    }
}

/// Produces [`MetricsSnapshot`]s from the live game state.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    config: MetricsConfig,
}

impl MetricsEngine {
    #[must_use]
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Evaluates `board` together with the upcoming `preview` shapes.
    ///
    /// Runs both searches, so the cost is dominated by
    /// `catalog.len() * rows * cols` trial placements.
    #[must_use]
    pub fn snapshot(
        &self,
        board: &Board,
        catalog: &ShapeCatalog,
        preview: &[ShapeId],
        player: &PlayerMetrics,
    ) -> MetricsSnapshot {
        let config = &self.config;
        let low = config.low_clear_threshold;
        let high = config.high_clear_threshold;

        let imminent_threat = preview
            .iter()
            .any(|id| !board.can_place_anywhere(&catalog[*id]));

        MetricsSnapshot {
            board: BoardMetrics::from_board(board, &config.danger_weights),
            imminent_threat,
            phase: Phase::from_move_count(player.move_count()),
            best_fit: compute_best_fit(board, catalog),
            game_over_block: find_game_over_block(board, catalog, preview),
            move_count: player.move_count(),
            lines_cleared_total: player.lines_cleared_total(),
            score: player.score(),
            clear_rate: player.clear_rate(),
            mistake_count: player.mistake_count(),
            mistake_rate: player.mistake_rate(),
            window_mistake_rate: player.window_mistake_rate(),
            window_time_per_move: player.window_time_per_move(),
            perf_band: player.perf_band(low, high),
            player_level: player.player_level(),
            emotional_state: player.emotional_state(config.max_time_per_move(), high),
            recent_moves: player.recent_moves().iter().copied().collect(),
        }
    }
}

/// Immutable result of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(flatten)]
    pub board: BoardMetrics,
    /// Some previewed shape fits nowhere on the current board.
    pub imminent_threat: bool,
    pub phase: Phase,
    pub best_fit: Option<BestFit>,
    pub game_over_block: Option<ShapeId>,
    pub move_count: usize,
    pub lines_cleared_total: usize,
    pub score: usize,
    pub clear_rate: f64,
    pub mistake_count: usize,
    pub mistake_rate: f64,
    pub window_mistake_rate: f64,
    pub window_time_per_move: Duration,
    pub perf_band: PerfBand,
    pub player_level: PlayerLevel,
    pub emotional_state: EmotionalState,
    pub recent_moves: Vec<MoveRecord>,
}

impl MetricsSnapshot {
    /// A game-over block exists.
    #[must_use]
    pub fn opportunity(&self) -> bool {
        self.game_over_block.is_some()
    }

    #[must_use]
    pub fn max_lines_cleared(&self) -> usize {
        self.best_fit.map_or(0, |fit| fit.lines_cleared)
    }

    /// Resolves shape ids to names for display and JSON output.
    #[must_use]
    pub fn report(&self, catalog: &ShapeCatalog) -> MetricsReport {
        MetricsReport {
            occupancy_ratio: self.board.occupancy_ratio,
            fragmentation_count: self.board.fragmentation_count,
            largest_empty_region: self.board.largest_empty_region,
            danger_score: self.board.danger_score,
            imminent_threat: self.imminent_threat,
            phase: self.phase,
            best_fit_block: self.best_fit.map(|fit| catalog.name(fit.shape).to_owned()),
            best_fit_position: self.best_fit.map(|fit| fit.position),
            max_lines_cleared: self.max_lines_cleared(),
            game_over_block: self.game_over_block.map(|id| catalog.name(id).to_owned()),
            opportunity: self.opportunity(),
            move_count: self.move_count,
            lines_cleared_total: self.lines_cleared_total,
            clear_rate: self.clear_rate,
            mistake_rate: self.mistake_rate,
            avg_time_per_move_secs: self.window_time_per_move.as_secs_f64(),
            perf_band: self.perf_band,
            player_level: self.player_level,
            emotional_state: self.emotional_state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub occupancy_ratio: f64,
    pub fragmentation_count: usize,
    pub largest_empty_region: f64,
    pub danger_score: f64,
    pub imminent_threat: bool,
    pub phase: Phase,
    pub best_fit_block: Option<String>,
    pub best_fit_position: Option<Position>,
    pub max_lines_cleared: usize,
    pub game_over_block: Option<String>,
    pub opportunity: bool,
    pub move_count: usize,
    pub lines_cleared_total: usize,
    pub clear_rate: f64,
    pub mistake_rate: f64,
    pub avg_time_per_move_secs: f64,
    pub perf_band: PerfBand,
    pub player_level: PlayerLevel,
    pub emotional_state: EmotionalState,
}
