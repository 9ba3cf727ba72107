//! Board evaluation for adaptive difficulty.
//!
//! - [`board_metrics`] - Occupancy, BFS fragmentation and the danger score
//! - [`best_fit`] - Exhaustive search for the most helpful shape and anchor
//! - [`future`] - Bounded look-ahead that finds game-over blocks
//! - [`player`] - Per-move clear rate, mistakes and classifications
//! - [`snapshot`] - [`MetricsEngine`] combining all of the above
//! - [`greedy`] - Automated players for simulations
//!
//! # Example
//!
//! ```
//! use blockharness_engine::{Board, ShapeCatalog};
//! use blockharness_evaluator::{MetricsEngine, PlayerMetrics};
//!
//! let catalog = ShapeCatalog::builtin();
//! let preview: Vec<_> = catalog.ids().take(3).collect();
//! let snapshot = MetricsEngine::default().snapshot(
//!     &Board::default(),
//!     &catalog,
//!     &preview,
//!     &PlayerMetrics::new(),
//! );
//! assert!(!snapshot.opportunity());
//! assert_eq!(snapshot.board.fragmentation_count, 1);
//! ```

pub use self::{
    player::PlayerMetrics,
    snapshot::{MetricsConfig, MetricsEngine, MetricsReport, MetricsSnapshot},
};

pub mod best_fit;
pub mod board_metrics;
pub mod future;
pub mod greedy;
pub mod player;
pub mod snapshot;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum MetricsConfigError {
    #[display("danger weight `{name}` must be a non-negative number, got {value}")]
    NegativeWeight { name: &'static str, value: f64 },
    #[display("`{name}` must be within [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },
    #[display("low clear threshold {low} exceeds high clear threshold {high}")]
    InvertedThresholds { low: f64, high: f64 },
    #[display("max time per move must be positive, got {value}")]
    InvalidMaxTime { value: f64 },
}
