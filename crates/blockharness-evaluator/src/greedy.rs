//! Automated players used to drive simulations.

use std::fmt;

use blockharness_engine::{Board, Position, ShapeCatalog, ShapeId};
use rand::{Rng, seq::IndexedRandom as _};

/// A placement chosen by a player: which preview slot to play and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub preview_index: usize,
    pub shape: ShapeId,
    pub position: Position,
    pub lines_cleared: usize,
}

pub trait Player: fmt::Debug {
    /// Picks the next move, or `None` when no preview shape fits anywhere.
    fn choose_move(
        &mut self,
        board: &Board,
        catalog: &ShapeCatalog,
        preview: &[ShapeId],
    ) -> Option<Move>;
}

/// Automated player selectable by name, case-insensitively.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum PlayerKind {
    #[default]
    Greedy,
    Random,
    EdgeHugging,
}

fn candidate_moves<'a>(
    board: &'a Board,
    catalog: &'a ShapeCatalog,
    preview: &'a [ShapeId],
) -> impl Iterator<Item = Move> + 'a {
    preview
        .iter()
        .enumerate()
        .flat_map(move |(preview_index, &shape)| {
            let block = &catalog[shape];
            board.valid_positions(block).map(move |position| Move {
                preview_index,
                shape,
                position,
                lines_cleared: board
                    .lines_if_placed(block, position.row(), position.col())
                    .unwrap_or(0),
            })
        })
}

/// Plays the move that clears the most lines; the first one found wins ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyPlayer;

impl Player for GreedyPlayer {
    fn choose_move(
        &mut self,
        board: &Board,
        catalog: &ShapeCatalog,
        preview: &[ShapeId],
    ) -> Option<Move> {
        let mut best: Option<Move> = None;
        for candidate in candidate_moves(board, catalog, preview) {
            if best.is_none_or(|b| candidate.lines_cleared > b.lines_cleared) {
                best = Some(candidate);
            }
        }
        best
    }
}

const EDGE_WEIGHT: f64 = 1.5;
const COMPACTNESS_WEIGHT: f64 = 1.0;
const LINE_CLEAR_BONUS: f64 = 10.0;

/// Keeps the filled cells along the border and close together.
///
/// Each candidate is scored on the board right after placement, before any
/// line is cleared. The first candidate found wins ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeHuggingPlayer;

impl EdgeHuggingPlayer {
    #[expect(clippy::cast_precision_loss)]
    fn score(board: &Board, lines_cleared: usize) -> f64 {
        EDGE_WEIGHT * edge_score(board)
            + COMPACTNESS_WEIGHT * compactness(board)
            + LINE_CLEAR_BONUS * lines_cleared as f64
    }
}

impl Player for EdgeHuggingPlayer {
    fn choose_move(
        &mut self,
        board: &Board,
        catalog: &ShapeCatalog,
        preview: &[ShapeId],
    ) -> Option<Move> {
        let mut best: Option<(Move, f64)> = None;
        for candidate in candidate_moves(board, catalog, preview) {
            let mut placed = board.clone();
            let position = candidate.position;
            if placed
                .place(&catalog[candidate.shape], position.row(), position.col())
                .is_err()
            {
                continue;
            }
            let score = Self::score(&placed, candidate.lines_cleared);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((candidate, score));
            }
        }
        best.map(|(mv, _)| mv)
    }
}

/// Percentage of border cells that are filled.
#[expect(clippy::cast_precision_loss)]
fn edge_score(board: &Board) -> f64 {
    let (last_row, last_col) = (board.rows() - 1, board.cols() - 1);
    let (border, filled) = board
        .positions()
        .filter(|p| p.row() == 0 || p.row() == last_row || p.col() == 0 || p.col() == last_col)
        .fold((0_usize, 0_usize), |(border, filled), p| {
            (border + 1, filled + usize::from(board.is_filled(p)))
        });
    if border == 0 {
        return 0.0;
    }
    filled as f64 / border as f64 * 100.0
}

/// Filled right/down neighbour pairs relative to `2 * filled - rows - cols`,
/// as a percentage.
#[expect(clippy::cast_precision_loss)]
fn compactness(board: &Board) -> f64 {
    let (rows, cols) = (board.rows(), board.cols());
    let adjacent: usize = board
        .positions()
        .filter(|p| board.is_filled(*p))
        .map(|p| {
            let right = p.col() + 1 < cols && board.is_filled(Position::new(p.row(), p.col() + 1));
            let down = p.row() + 1 < rows && board.is_filled(Position::new(p.row() + 1, p.col()));
            usize::from(right) + usize::from(down)
        })
        .sum();
    let max_adjacent = (2 * board.filled_count()).saturating_sub(rows + cols);
    if max_adjacent == 0 {
        return 0.0;
    }
    adjacent as f64 / max_adjacent as f64 * 100.0
}

/// Plays a uniformly random legal move.
#[derive(Debug, Clone)]
pub struct RandomPlayer<R> {
    rng: R,
}

impl<R> RandomPlayer<R> {
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R> Player for RandomPlayer<R>
where
    R: Rng + fmt::Debug,
{
    fn choose_move(
        &mut self,
        board: &Board,
        catalog: &ShapeCatalog,
        preview: &[ShapeId],
    ) -> Option<Move> {
        let moves: Vec<_> = candidate_moves(board, catalog, preview).collect();
        moves.choose(&mut self.rng).copied()
    }
}
