use serde::{Deserialize, Serialize};

/// Number of buckets in [`GameStats::line_cleared_counter`]; the last bucket
/// also counts every move that cleared more lines.
const LINE_COUNTER_LEN: usize = 6;

/// Points awarded for a single committed move.
///
/// - 0 lines: 1 point (placement bonus)
/// - n lines: `100 * n` plus a combo bonus of `50 * (n - 1)`
#[must_use]
pub const fn move_points(cleared_lines: usize) -> usize {
    if cleared_lines == 0 {
        1
    } else {
        100 * cleared_lines + 50 * (cleared_lines - 1)
    }
}

/// Game statistics tracking score, lines cleared, and block count.
///
/// # Example
///
/// ```
/// use blockharness_engine::GameStats;
///
/// let mut stats = GameStats::new();
/// stats.complete_move(0);
/// stats.complete_move(2); // a row and a column
///
/// assert_eq!(stats.score(), 1 + 250);
/// assert_eq!(stats.total_cleared_lines(), 2);
/// assert_eq!(stats.blocks_placed(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    score: usize,
    blocks_placed: usize,
    total_cleared_lines: usize,
    line_cleared_counter: [usize; LINE_COUNTER_LEN],
}

impl GameStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            score: 0,
            blocks_placed: 0,
            total_cleared_lines: 0,
            line_cleared_counter: [0; LINE_COUNTER_LEN],
        }
    }

    #[must_use]
    pub const fn score(&self) -> usize {
        self.score
    }

    #[must_use]
    pub const fn blocks_placed(&self) -> usize {
        self.blocks_placed
    }

    #[must_use]
    pub const fn total_cleared_lines(&self) -> usize {
        self.total_cleared_lines
    }

    /// Histogram of moves by lines cleared; index 5 collects 5 or more.
    #[must_use]
    pub const fn line_cleared_counter(&self) -> &[usize; LINE_COUNTER_LEN] {
        &self.line_cleared_counter
    }

    /// Updates statistics after a committed move and returns the points it
    /// earned.
    pub fn complete_move(&mut self, cleared_lines: usize) -> usize {
        let points = move_points(cleared_lines);
        self.blocks_placed += 1;
        self.total_cleared_lines += cleared_lines;
        self.line_cleared_counter[cleared_lines.min(LINE_COUNTER_LEN - 1)] += 1;
        self.score += points;
        points
    }
}
