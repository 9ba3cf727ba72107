//! Board-state metrics: occupancy, empty-region fragmentation and danger.
//!
//! All values are recomputed from scratch for every snapshot in
//! `O(rows * cols)`.
//!
//! # Empty regions
//!
//! Empty cells are partitioned into 4-connected regions with a breadth-first
//! search. An empty board is a single region, so `fragmentation_count` is 1;
//! a completely filled board has no region at all and reports 0. The danger
//! score clamps the divisor to 1, so both cases are well defined.

use std::collections::VecDeque;

use blockharness_engine::{Board, Position};
use serde::{Deserialize, Serialize};

/// Weights of the three danger-score components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DangerWeights {
    pub occupancy: f64,
    pub fragmentation: f64,
    pub inv_largest: f64,
}

impl Default for DangerWeights {
    fn default() -> Self {
        Self {
            occupancy: 0.50,
            fragmentation: 0.30,
            inv_largest: 0.20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardMetrics {
    /// Filled cells over total cells, in `[0, 1]`.
    pub occupancy_ratio: f64,
    /// Number of 4-connected empty regions.
    pub fragmentation_count: usize,
    /// Size of the largest empty region over all empty cells, in `[0, 1]`.
    pub largest_empty_region: f64,
    /// Weighted composite; higher is more dangerous.
    pub danger_score: f64,
}

impl BoardMetrics {
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_board(board: &Board, weights: &DangerWeights) -> Self {
        let filled = board.filled_count();
        let empty = board.total_cells() - filled;
        let regions = empty_region_sizes(board);

        let occupancy_ratio = filled as f64 / board.total_cells() as f64;
        let fragmentation_count = regions.len();
        let largest_empty_region = match regions.iter().max() {
            Some(largest) if empty > 0 => *largest as f64 / empty as f64,
            _ => 0.0,
        };

        let inv_fragmentation = 1.0 / fragmentation_count.max(1) as f64;
        let danger_score = weights.occupancy * occupancy_ratio
            + weights.fragmentation * inv_fragmentation
            + weights.inv_largest * (1.0 - largest_empty_region);

        Self {
            occupancy_ratio,
            fragmentation_count,
            largest_empty_region,
            danger_score,
        }
    }
}

/// Sizes of the 4-connected empty regions, in row-major discovery order.
#[must_use]
pub fn empty_region_sizes(board: &Board) -> Vec<usize> {
    let (rows, cols) = (board.rows(), board.cols());
    let index = |pos: Position| pos.row() * cols + pos.col();

    let mut visited = vec![false; rows * cols];
    let mut queue = VecDeque::new();
    let mut sizes = vec![];

    for start in board.positions() {
        if board.is_filled(start) || visited[index(start)] {
            continue;
        }
        visited[index(start)] = true;
        queue.push_back(start);
        let mut size = 0;

        while let Some(pos) = queue.pop_front() {
            size += 1;
            let (r, c) = (pos.row(), pos.col());
            let neighbors = [
                (r > 0).then(|| Position::new(r - 1, c)),
                (r + 1 < rows).then(|| Position::new(r + 1, c)),
                (c > 0).then(|| Position::new(r, c - 1)),
                (c + 1 < cols).then(|| Position::new(r, c + 1)),
            ];
            for next in neighbors.into_iter().flatten() {
                if !board.is_filled(next) && !visited[index(next)] {
                    visited[index(next)] = true;
                    queue.push_back(next);
                }
            }
        }
        sizes.push(size);
    }
    sizes
}

/// Coarse game phase derived from the number of committed moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[display("early")]
    Early,
    #[display("mid")]
    Mid,
    #[display("late")]
    Late,
}

impl Phase {
    #[must_use]
    pub const fn from_move_count(move_count: usize) -> Self {
        match move_count {
            0..=9 => Self::Early,
            10..=29 => Self::Mid,
            _ => Self::Late,
        }
    }
}
