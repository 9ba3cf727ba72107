//! Board and shape model for the block-placement puzzle.
//!
//! The puzzle is played on a small square grid (8×8 by default). Shapes are
//! fixed footprints of cells that are placed anywhere they fit; whenever a row
//! *or* a column becomes completely filled it is cleared. There is no gravity
//! and no rotation.
//!
//! - [`Board`] - Grid of filled/empty cells with placement and line detection
//! - [`Shape`] / [`ShapeCatalog`] - Named, immutable cell-offset sets
//! - [`FullLines`] - Rows and columns that are complete after a placement
//! - [`GameStats`] - Score, lines and block counters
//!
//! # Example
//!
//! ```
//! use blockharness_engine::{Board, ShapeCatalog};
//!
//! let catalog = ShapeCatalog::builtin();
//! let line = catalog.shape_by_name("1x5-line").unwrap();
//!
//! let mut board = Board::new(5, 5).unwrap();
//! assert!(board.can_place(line, 0, 0));
//! let cleared = board.place_and_clear(line, 0, 0).unwrap();
//! assert_eq!(cleared, 1);
//! assert_eq!(board.filled_count(), 0);
//! ```

pub use self::{board::*, shape::*, stats::*};

mod board;
mod shape;
mod stats;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("shape `{shape}` does not fit at ({row}, {col})")]
pub struct PlacementError {
    shape: String,
    row: usize,
    col: usize,
}

impl PlacementError {
    #[must_use]
    pub fn new(shape: &Shape, row: usize, col: usize) -> Self {
        Self {
            shape: shape.name().to_owned(),
            row,
            col,
        }
    }

    #[must_use]
    pub fn shape(&self) -> &str {
        &self.shape
    }

    #[must_use]
    pub fn position(&self) -> Position {
        Position::new(self.row, self.col)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum BoardError {
    #[display("board dimensions must be within 1..=64, got {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },
    #[display("board art contains no rows")]
    EmptyArt,
    #[display("board art row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ShapeError {
    #[display("shape `{name}` has no cells")]
    EmptyShape { name: String },
    #[display("shape `{name}` does not fit in a 64x64 grid")]
    TooLarge { name: String },
    #[display("shape `{name}` is defined more than once")]
    DuplicateName { name: String },
    #[display("shape catalog is empty")]
    EmptyCatalog,
    #[display("unknown shape `{name}`")]
    UnknownShape { name: String },
}
