use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{BoardError, PlacementError, shape::Shape};

/// Largest supported number of rows or columns.
///
/// Each row is stored as a single `u64` bitmask.
pub const MAX_BOARD_DIMENSION: usize = 64;

pub const DEFAULT_BOARD_SIZE: usize = 8;

/// Cell coordinate on the board, `(row, col)` with `(0, 0)` at the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    row: usize,
    col: usize,
}

impl Position {
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    #[must_use]
    pub const fn row(self) -> usize {
        self.row
    }

    #[must_use]
    pub const fn col(self) -> usize {
        self.col
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[inline]
const fn full_row_mask(cols: usize) -> u64 {
    if cols >= MAX_BOARD_DIMENSION {
        u64::MAX
    } else {
        (1 << cols) - 1
    }
}

/// Rows and columns that are completely filled at one instant.
///
/// Rows and columns are tracked as bitmasks, so a cell that lies on both a
/// full row and a full column is a member of the set only once, while
/// [`Self::count`] still counts the row and the column separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullLines {
    rows: u64,
    cols: u64,
    board_rows: usize,
    board_cols: usize,
}

impl FullLines {
    /// Number of cleared lines: full rows plus full columns.
    #[must_use]
    pub const fn count(&self) -> usize {
        (self.rows.count_ones() + self.cols.count_ones()) as usize
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows == 0 && self.cols == 0
    }

    pub fn full_rows(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.board_rows).filter(|r| self.rows & (1 << r) != 0)
    }

    pub fn full_cols(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.board_cols).filter(|c| self.cols & (1 << c) != 0)
    }

    #[must_use]
    pub const fn contains(&self, pos: Position) -> bool {
        self.rows & (1 << pos.row) != 0 || self.cols & (1 << pos.col) != 0
    }

    /// Iterates over the union of all cells on a full row or a full column.
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.board_rows)
            .flat_map(move |row| (0..self.board_cols).map(move |col| Position::new(row, col)))
            .filter(|pos| self.contains(*pos))
    }
}

/// Fixed-size grid of filled/empty cells.
///
/// Each row is a `u64` where bit `c` is set when column `c` is filled. Cloning
/// a board is a single copy of the row vector, which keeps the search
/// algorithms (which clone once per candidate placement) cheap.
///
/// # Example
///
/// ```
/// use blockharness_engine::{Board, Position};
///
/// let board = Board::from_ascii(
///     r"
///     ###..
///     ....
///     ....
///     ...#
///     ",
/// )
/// .unwrap();
/// assert_eq!(board.rows(), 4);
/// assert!(board.is_filled(Position::new(3, 3)));
/// assert_eq!(board.filled_count(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<u64>,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            rows: DEFAULT_BOARD_SIZE,
            cols: DEFAULT_BOARD_SIZE,
            cells: vec![0; DEFAULT_BOARD_SIZE],
        }
    }
}

impl Board {
    /// Creates an empty board.
    pub fn new(rows: usize, cols: usize) -> Result<Self, BoardError> {
        if !(1..=MAX_BOARD_DIMENSION).contains(&rows) || !(1..=MAX_BOARD_DIMENSION).contains(&cols)
        {
            return Err(BoardError::InvalidDimensions { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            cells: vec![0; rows],
        })
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub const fn total_cells(&self) -> usize {
        self.rows * self.cols
    }

    /// Column the center tie-break measures distances from.
    #[must_use]
    pub const fn center_col(&self) -> usize {
        self.cols / 2
    }

    #[must_use]
    pub fn is_filled(&self, pos: Position) -> bool {
        self.cells[pos.row] & (1 << pos.col) != 0
    }

    #[must_use]
    pub fn filled_count(&self) -> usize {
        self.cells.iter().map(|row| row.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn empty_count(&self) -> usize {
        self.total_cells() - self.filled_count()
    }

    /// All board positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<> {
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| (0..cols).map(move |col| Position::new(row, col)))
    }

    /// Returns `true` iff every cell of `shape` anchored at `(row, col)` is on
    /// the board and currently empty.
    #[must_use]
    pub fn can_place(&self, shape: &Shape, row: usize, col: usize) -> bool {
        let fits_rows = row
            .checked_add(shape.height())
            .is_some_and(|end| end <= self.rows);
        let fits_cols = col
            .checked_add(shape.width())
            .is_some_and(|end| end <= self.cols);
        if !fits_rows || !fits_cols {
            return false;
        }
        shape
            .row_masks()
            .iter()
            .zip(&self.cells[row..])
            .all(|(mask, bits)| bits & (mask << col) == 0)
    }

    /// Fills the cells of `shape` anchored at `(row, col)`.
    ///
    /// Fails without touching the board when [`Self::can_place`] is `false`.
    pub fn place(&mut self, shape: &Shape, row: usize, col: usize) -> Result<(), PlacementError> {
        if !self.can_place(shape, row, col) {
            return Err(PlacementError::new(shape, row, col));
        }
        for (mask, bits) in shape.row_masks().iter().zip(&mut self.cells[row..]) {
            *bits |= mask << col;
        }
        Ok(())
    }

    /// Finds every row and column that is entirely filled.
    #[must_use]
    pub fn find_full_lines(&self) -> FullLines {
        let full = full_row_mask(self.cols);
        let mut rows = 0;
        let mut cols = full;
        for (r, bits) in self.cells.iter().enumerate() {
            if *bits == full {
                rows |= 1 << r;
            }
            cols &= bits;
        }
        FullLines {
            rows,
            cols,
            board_rows: self.rows,
            board_cols: self.cols,
        }
    }

    /// Empties every cell in `lines`.
    pub fn clear(&mut self, lines: &FullLines) {
        for (r, bits) in self.cells.iter_mut().enumerate() {
            if lines.rows & (1 << r) != 0 {
                *bits = 0;
            } else {
                *bits &= !lines.cols;
            }
        }
    }

    /// Places `shape`, clears the resulting full lines and returns how many
    /// lines (rows + columns) were cleared.
    pub fn place_and_clear(
        &mut self,
        shape: &Shape,
        row: usize,
        col: usize,
    ) -> Result<usize, PlacementError> {
        self.place(shape, row, col)?;
        let lines = self.find_full_lines();
        self.clear(&lines);
        Ok(lines.count())
    }

    /// Lines that placing `shape` at `(row, col)` would complete, or `None`
    /// when the shape does not fit there. The board itself is not modified.
    #[must_use]
    pub fn lines_if_placed(&self, shape: &Shape, row: usize, col: usize) -> Option<usize> {
        let mut board = self.clone();
        board.place(shape, row, col).ok()?;
        Some(board.find_full_lines().count())
    }

    /// Iterates over every anchor where `shape` fits, in row-major order.
    pub fn valid_positions<'a>(&'a self, shape: &'a Shape) -> impl Iterator<Item = Position> + 'a {
        self.positions()
            .filter(move |pos| self.can_place(shape, pos.row, pos.col))
    }

    #[must_use]
    pub fn can_place_anywhere(&self, shape: &Shape) -> bool {
        self.valid_positions(shape).next().is_some()
    }

    /// Creates a board from ASCII art: `#` is filled, `.` is empty.
    ///
    /// Blank lines are skipped and any other characters are ignored, so the
    /// art may be indented. The board takes its size from the art.
    pub fn from_ascii(art: &str) -> Result<Self, BoardError> {
        let lines: Vec<Vec<bool>> = art
            .lines()
            .map(|line| {
                line.chars()
                    .filter(|c| *c == '#' || *c == '.')
                    .map(|c| c == '#')
                    .collect::<Vec<_>>()
            })
            .filter(|cells| !cells.is_empty())
            .collect();
        let Some(first) = lines.first() else {
            return Err(BoardError::EmptyArt);
        };
        let mut board = Self::new(lines.len(), first.len())?;
        for (row, cells) in lines.iter().enumerate() {
            if cells.len() != board.cols {
                return Err(BoardError::RaggedRow {
                    row,
                    expected: board.cols,
                    actual: cells.len(),
                });
            }
            for (col, filled) in cells.iter().enumerate() {
                if *filled {
                    board.cells[row] |= 1 << col;
                }
            }
        }
        Ok(board)
    }

    fn row_string(&self, row: usize) -> String {
        (0..self.cols)
            .map(|col| {
                if self.is_filled(Position::new(row, col)) {
                    '#'
                } else {
                    '.'
                }
            })
            .collect()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            writeln!(f, "{}", self.row_string(row))?;
        }
        Ok(())
    }
}

impl Serialize for Board {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Format: ["#...", "....", ...] (one string per row)
        serializer.collect_seq((0..self.rows).map(|row| self.row_string(row)))
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let rows = Vec::<String>::deserialize(deserializer)?;
        Self::from_ascii(&rows.join("\n")).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single() -> Shape {
        Shape::new("1x1", [(0, 0)]).unwrap()
    }

    fn l_shape() -> Shape {
        Shape::new("L", [(0, 0), (1, 0), (1, 1)]).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_dimensions() {
        assert!(Board::new(0, 8).is_err());
        assert!(Board::new(8, 65).is_err());
        assert!(Board::new(64, 64).is_ok());
    }

    #[test]
    fn test_can_place_checks_bounds_and_occupancy() {
        let mut board = Board::new(4, 4).unwrap();
        let shape = l_shape();

        assert!(board.can_place(&shape, 0, 0));
        assert!(board.can_place(&shape, 2, 2));
        assert!(!board.can_place(&shape, 3, 0));
        assert!(!board.can_place(&shape, 0, 3));
        assert!(!board.can_place(&shape, usize::MAX, 0));

        board.place(&single(), 1, 1).unwrap();
        assert!(!board.can_place(&shape, 0, 0));
        assert!(board.can_place(&shape, 0, 2));
    }

    #[test]
    fn test_place_fills_exactly_shape_cells() {
        let mut board = Board::new(5, 5).unwrap();
        let shape = l_shape();
        board.place(&shape, 2, 3).unwrap();

        let filled: Vec<_> = board
            .positions()
            .filter(|pos| board.is_filled(*pos))
            .collect();
        assert_eq!(
            filled,
            vec![
                Position::new(2, 3),
                Position::new(3, 3),
                Position::new(3, 4)
            ]
        );
    }

    #[test]
    fn test_place_rejects_without_side_effects() {
        let mut board = Board::new(3, 3).unwrap();
        board.place(&single(), 1, 1).unwrap();
        let before = board.clone();

        let err = board.place(&l_shape(), 0, 1).unwrap_err();
        assert_eq!(err.shape(), "L");
        assert_eq!(err.position(), Position::new(0, 1));
        assert_eq!(board, before);
    }

    #[test]
    fn test_find_full_lines_rows_and_columns() {
        let board = Board::from_ascii(
            r"
            ####
            #...
            #...
            #...
            ",
        )
        .unwrap();
        let lines = board.find_full_lines();

        assert_eq!(lines.count(), 2);
        assert_eq!(lines.full_rows().collect::<Vec<_>>(), vec![0]);
        assert_eq!(lines.full_cols().collect::<Vec<_>>(), vec![0]);
        // The shared corner is a single cell in the set.
        assert_eq!(lines.cells().count(), 7);
    }

    #[test]
    fn test_clear_empties_full_row() {
        let mut board = Board::from_ascii(
            r"
            ....
            ####
            .#..
            ....
            ",
        )
        .unwrap();
        let lines = board.find_full_lines();
        assert!(lines.contains(Position::new(1, 0)));

        board.clear(&lines);
        assert!((0..4).all(|col| !board.is_filled(Position::new(1, col))));
        assert!(board.is_filled(Position::new(2, 1)));
        assert_eq!(board.filled_count(), 1);
    }

    #[test]
    fn test_row_clears_when_eighth_cell_is_filled() {
        let mut board = Board::default();
        let shape = single();
        for col in 0..7 {
            assert_eq!(board.place_and_clear(&shape, 0, col).unwrap(), 0);
        }
        assert_eq!(board.place_and_clear(&shape, 0, 7).unwrap(), 1);
        assert_eq!(board.filled_count(), 0);
    }

    #[test]
    fn test_full_width_board_uses_all_bits() {
        let mut board = Board::new(2, 64).unwrap();
        let shape = single();
        for col in 0..64 {
            board.place(&shape, 0, col).unwrap();
        }
        let lines = board.find_full_lines();
        assert_eq!(lines.count(), 1);
        assert_eq!(lines.full_rows().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_lines_if_placed_does_not_mutate() {
        let board = Board::from_ascii(
            r"
            ###.
            ....
            ....
            ....
            ",
        )
        .unwrap();
        assert_eq!(board.lines_if_placed(&single(), 0, 3), Some(1));
        assert_eq!(board.lines_if_placed(&single(), 0, 0), None);
        assert_eq!(board.filled_count(), 3);
    }

    #[test]
    fn test_from_ascii_rejects_ragged_rows() {
        let err = Board::from_ascii("##.\n#.\n").unwrap_err();
        assert_eq!(
            err,
            BoardError::RaggedRow {
                row: 1,
                expected: 3,
                actual: 2
            }
        );
        assert_eq!(Board::from_ascii("\n\n").unwrap_err(), BoardError::EmptyArt);
    }

    #[test]
    fn test_board_serialization() {
        let board = Board::from_ascii(
            r"
            #..
            .#.
            ..#
            ",
        )
        .unwrap();
        let serialized = serde_json::to_string(&board).unwrap();
        assert_eq!(serialized, r##"["#..",".#.","..#"]"##);

        let deserialized: Board = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, board);
    }
}
