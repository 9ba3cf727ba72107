//! Per-move player performance tracking.
//!
//! [`PlayerMetrics`] is updated once per committed move (and once per
//! rejected placement attempt), never per snapshot. Elapsed time is measured
//! by the caller and passed in.

use std::{collections::VecDeque, time::Duration};

use serde::{Deserialize, Serialize};

/// Number of moves kept for the sliding-window statistics.
pub const RECENT_MOVES_LEN: usize = 10;

/// Outcome of one committed move as reported by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub lines_cleared: usize,
    pub points: usize,
    pub elapsed: Duration,
}

/// Entry of the recent-moves window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub lines_cleared: usize,
    pub elapsed: Duration,
    /// Rejected placement attempts made before this move was committed.
    pub mistakes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMetrics {
    move_count: usize,
    lines_cleared_total: usize,
    score: usize,
    mistake_count: usize,
    pending_mistakes: usize,
    recent_moves: VecDeque<MoveRecord>,
}

impl PlayerMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a committed move.
    ///
    /// Mistakes recorded since the previous move are attached to this move's
    /// window entry; the oldest entry is dropped once the window holds
    /// [`RECENT_MOVES_LEN`] moves.
    pub fn record_move(&mut self, outcome: MoveOutcome) {
        self.move_count += 1;
        self.lines_cleared_total += outcome.lines_cleared;
        self.score += outcome.points;

        if self.recent_moves.len() == RECENT_MOVES_LEN {
            self.recent_moves.pop_front();
        }
        self.recent_moves.push_back(MoveRecord {
            lines_cleared: outcome.lines_cleared,
            elapsed: outcome.elapsed,
            mistakes: self.pending_mistakes,
        });
        self.pending_mistakes = 0;
    }

    /// Records a placement attempt that was rejected by the board.
    pub fn record_mistake(&mut self) {
        self.mistake_count += 1;
        self.pending_mistakes += 1;
    }

    #[must_use]
    pub fn move_count(&self) -> usize {
        self.move_count
    }

    #[must_use]
    pub fn lines_cleared_total(&self) -> usize {
        self.lines_cleared_total
    }

    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    #[must_use]
    pub fn mistake_count(&self) -> usize {
        self.mistake_count
    }

    /// Oldest first.
    #[must_use]
    pub fn recent_moves(&self) -> &VecDeque<MoveRecord> {
        &self.recent_moves
    }

    /// Lines cleared per committed move.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn clear_rate(&self) -> f64 {
        self.lines_cleared_total as f64 / self.move_count.max(1) as f64
    }

    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mistake_rate(&self) -> f64 {
        self.mistake_count as f64 / self.move_count.max(1) as f64
    }

    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn window_lines_per_move(&self) -> f64 {
        let lines: usize = self.recent_moves.iter().map(|m| m.lines_cleared).sum();
        lines as f64 / self.recent_moves.len().max(1) as f64
    }

    /// Mean thinking time over the window, zero before the first move.
    #[must_use]
    pub fn window_time_per_move(&self) -> Duration {
        let total: Duration = self.recent_moves.iter().map(|m| m.elapsed).sum();
        match u32::try_from(self.recent_moves.len()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => total / n,
        }
    }

    #[must_use]
    pub fn window_mistakes(&self) -> usize {
        self.recent_moves.iter().map(|m| m.mistakes).sum()
    }

    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn window_mistake_rate(&self) -> f64 {
        self.window_mistakes() as f64 / self.recent_moves.len().max(1) as f64
    }

    #[must_use]
    pub fn last_elapsed(&self) -> Option<Duration> {
        self.recent_moves.back().map(|m| m.elapsed)
    }

    #[must_use]
    pub fn perf_band(&self, low: f64, high: f64) -> PerfBand {
        PerfBand::classify(self.clear_rate(), low, high)
    }

    #[must_use]
    pub fn player_level(&self) -> PlayerLevel {
        PlayerLevel::classify(self.clear_rate())
    }

    /// Reads the player's mood from the time spent on the latest move.
    ///
    /// Slower than 80% of `max_time_per_move` is frustrated; faster than 20%
    /// with a clear rate above `high` is bored.
    #[must_use]
    pub fn emotional_state(&self, max_time_per_move: Duration, high: f64) -> EmotionalState {
        let Some(last) = self.last_elapsed() else {
            return EmotionalState::Calm;
        };
        let last = last.as_secs_f64();
        let max = max_time_per_move.as_secs_f64();
        if last > 0.8 * max {
            EmotionalState::Frustrated
        } else if last < 0.2 * max && self.clear_rate() > high {
            EmotionalState::Bored
        } else {
            EmotionalState::Calm
        }
    }
}

/// How hard the game currently is for the player, judged by clear rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum PerfBand {
    Hard,
    #[display("OK")]
    Ok,
    Easy,
}

impl PerfBand {
    #[must_use]
    pub fn classify(clear_rate: f64, low: f64, high: f64) -> Self {
        if clear_rate < low {
            Self::Hard
        } else if clear_rate > high {
            Self::Easy
        } else {
            Self::Ok
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum PlayerLevel {
    Novice,
    Intermediate,
    Expert,
}

impl PlayerLevel {
    #[must_use]
    pub fn classify(clear_rate: f64) -> Self {
        if clear_rate < 0.2 {
            Self::Novice
        } else if clear_rate > 0.6 {
            Self::Expert
        } else {
            Self::Intermediate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum EmotionalState {
    Calm,
    Frustrated,
    Bored,
}
