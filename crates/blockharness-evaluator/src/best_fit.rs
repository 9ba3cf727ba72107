//! Exhaustive search for the placement that clears the most lines.
//!
//! Every catalog shape is tried at every anchor. Candidates are compared as
//! follows:
//!
//! 1. More cleared lines (rows + columns) wins outright.
//! 2. Among equal, non-zero clears the topmost anchor (smallest row) wins.
//! 3. On the same row, the anchor column strictly closer to `cols / 2` wins;
//!    at equal distance the candidate found first is kept. Shapes are scanned
//!    in catalog order and anchors in row-major order, so with an even board
//!    width the column to the left of center is kept over the one to the
//!    right.
//!
//! When no placement clears anything, the result is the first placement with
//! the smallest row in scan order, and the clear count plays no part.

use blockharness_engine::{Board, Position, ShapeCatalog, ShapeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestFit {
    pub shape: ShapeId,
    pub position: Position,
    pub lines_cleared: usize,
}

impl BestFit {
    fn beats(&self, other: &Self, center_col: usize) -> bool {
        if self.lines_cleared != other.lines_cleared {
            return self.lines_cleared > other.lines_cleared;
        }
        if self.position.row() != other.position.row() {
            return self.position.row() < other.position.row();
        }
        self.position.col().abs_diff(center_col) < other.position.col().abs_diff(center_col)
    }
}

/// Finds the best helper shape and anchor for `board`.
///
/// Returns `None` only when no catalog shape fits anywhere.
#[must_use]
pub fn compute_best_fit(board: &Board, catalog: &ShapeCatalog) -> Option<BestFit> {
    let center_col = board.center_col();
    let mut best: Option<BestFit> = None;
    let mut fallback: Option<BestFit> = None;

    for (shape_id, shape) in catalog.iter() {
        for position in board.valid_positions(shape) {
            if fallback.is_none_or(|f| position.row() < f.position.row()) {
                fallback = Some(BestFit {
                    shape: shape_id,
                    position,
                    lines_cleared: 0,
                });
            }

            let Some(lines_cleared) = board.lines_if_placed(shape, position.row(), position.col())
            else {
                continue;
            };
            if lines_cleared == 0 {
                continue;
            }
            let candidate = BestFit {
                shape: shape_id,
                position,
                lines_cleared,
            };
            if best.is_none_or(|b| candidate.beats(&b, center_col)) {
                best = Some(candidate);
            }
        }
    }

    let result = best.or(fallback);
    if let Some(fit) = &result {
        log::debug!(
            "best fit: {} at {} clearing {} line(s)",
            catalog.name(fit.shape),
            fit.position,
            fit.lines_cleared
        );
    }
    result
}
