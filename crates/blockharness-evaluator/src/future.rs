//! Game-over block detection through a bounded look-ahead over the preview.
//!
//! A shape is a game-over block when it fits nowhere on the current board and
//! still fits nowhere after the previewed shapes have been played. Playing the
//! preview is approximated by a breadth-first expansion that keeps at most
//! [`MAX_BRANCHES_PER_SHAPE`] placements per shape and stops at
//! [`MAX_FUTURE_BOARDS`] leaves.

use std::collections::VecDeque;

use arrayvec::ArrayVec;
use blockharness_engine::{Board, Position, Shape, ShapeCatalog, ShapeId};

pub const MAX_FUTURE_BOARDS: usize = 10;
pub const MAX_BRANCHES_PER_SHAPE: usize = 3;

/// Distinct placements explored for `shape` on `board`, in priority order:
///
/// 1. the placement clearing the most lines (first found on ties),
/// 2. the topmost placement (first valid anchor in row-major order),
/// 3. the topmost placement anchored on the center column.
///
/// Duplicates are dropped, so fewer than three positions may be returned.
/// The result is empty when the shape fits nowhere.
#[must_use]
pub fn branch_placements(
    board: &Board,
    shape: &Shape,
) -> ArrayVec<Position, MAX_BRANCHES_PER_SHAPE> {
    let center_col = board.center_col();
    let mut max_clear: Option<(Position, usize)> = None;
    let mut topmost = None;
    let mut centered = None;

    for pos in board.valid_positions(shape) {
        topmost.get_or_insert(pos);
        if centered.is_none() && pos.col() == center_col {
            centered = Some(pos);
        }
        let lines = board.lines_if_placed(shape, pos.row(), pos.col()).unwrap_or(0);
        if max_clear.is_none_or(|(_, best)| lines > best) {
            max_clear = Some((pos, lines));
        }
    }

    let mut branches = ArrayVec::new();
    for pos in [max_clear.map(|(pos, _)| pos), topmost, centered]
        .into_iter()
        .flatten()
    {
        if !branches.contains(&pos) {
            branches.push(pos);
        }
    }
    branches
}

#[derive(Debug)]
struct Branch {
    board: Board,
    next: usize,
}

/// Boards reachable by playing `preview` in order, at most
/// [`MAX_FUTURE_BOARDS`] of them.
///
/// A branch becomes a leaf when the preview is exhausted or when its next
/// shape fits nowhere. Every branch follows all of its
/// [`branch_placements`]; the expansion stops as soon as the cap is reached,
/// so the leaves are the first ones in breadth-first order. Never returns an
/// empty list: the current board is the fallback leaf.
#[must_use]
pub fn future_boards(board: &Board, catalog: &ShapeCatalog, preview: &[ShapeId]) -> Vec<Board> {
    let mut leaves = Vec::with_capacity(MAX_FUTURE_BOARDS);
    let mut queue = VecDeque::from([Branch {
        board: board.clone(),
        next: 0,
    }]);

    while let Some(branch) = queue.pop_front() {
        if leaves.len() >= MAX_FUTURE_BOARDS {
            break;
        }
        let Some(&shape_id) = preview.get(branch.next) else {
            leaves.push(branch.board);
            continue;
        };
        let shape = &catalog[shape_id];
        let placements = branch_placements(&branch.board, shape);
        if placements.is_empty() {
            leaves.push(branch.board);
            continue;
        }

        for pos in placements {
            let mut child = branch.board.clone();
            if child.place_and_clear(shape, pos.row(), pos.col()).is_ok() {
                queue.push_back(Branch {
                    board: child,
                    next: branch.next + 1,
                });
            }
        }
    }

    if leaves.is_empty() {
        leaves.push(board.clone());
    }
    log::trace!(
        "future search: {} leaf board(s) over {} preview shape(s)",
        leaves.len(),
        preview.len()
    );
    leaves
}

/// First catalog shape that fits nowhere now and nowhere on any future board.
///
/// The look-ahead only runs when some shape is already unplaceable.
#[must_use]
pub fn find_game_over_block(
    board: &Board,
    catalog: &ShapeCatalog,
    preview: &[ShapeId],
) -> Option<ShapeId> {
    let mut futures: Option<Vec<Board>> = None;

    for (shape_id, shape) in catalog.iter() {
        if board.can_place_anywhere(shape) {
            continue;
        }
        let leaves = futures.get_or_insert_with(|| future_boards(board, catalog, preview));
        if leaves.iter().all(|leaf| !leaf.can_place_anywhere(shape)) {
            log::debug!(
                "game-over block: {} (checked {} future board(s))",
                shape.name(),
                leaves.len()
            );
            return Some(shape_id);
        }
    }
    None
}
