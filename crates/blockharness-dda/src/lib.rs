//! Adaptive tray generation.
//!
//! Every time the preview tray runs empty, [`TrayGenerator::next_tray`] reads
//! the latest [`MetricsSnapshot`](blockharness_evaluator::MetricsSnapshot)
//! and decides what the player gets next. How it decides is selected by
//! [`TrayConfig::algorithm`]:
//!
//! - [`DdaAlgorithm::Opportunity`] (default): while the score is below
//!   [`TrayConfig::score_threshold`], struggling players receive the best-fit
//!   shape often (every tray when the clear rate is low, every second or third
//!   tray as it improves). Once the threshold has been reached, every tray
//!   carries the game-over shape whenever one exists.
//! - [`DdaAlgorithm::Static`]: weighted random shapes from the base weights.
//! - [`DdaAlgorithm::Threshold`]: like static, with the weights replaced at
//!   score steps (see [`TrayGenerator::with_difficulty_ramp`]).
//! - [`DdaAlgorithm::Interval`]: small rescue shapes and awkward shapes on a
//!   fixed tray rhythm.
//! - [`DdaAlgorithm::Metrics`]: emergency and rescue trays of small shapes
//!   when the board is in danger, otherwise a difficulty level that caps the
//!   shape size.
//!
//! All other slots are filled by weighted random draws that avoid repeats.

pub use self::{config::*, generator::*, seed::*};

mod config;
mod generator;
mod seed;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum TrayConfigError {
    #[display("tray size must be at least 1")]
    EmptyTray,
    #[display("`{name}` ({count}) exceeds the tray size ({tray_size})")]
    TooManyInjected {
        name: &'static str,
        count: usize,
        tray_size: usize,
    },
    #[display("`{name}` must be within [0, 1], got {value}")]
    RateOutOfRange { name: &'static str, value: f64 },
    #[display("low clear rate {low} exceeds high clear rate {high}")]
    InvertedRates { low: f64, high: f64 },
    #[display("`{name}` must be at least 1")]
    ZeroInterval { name: &'static str },
    #[display("initial difficulty must be within 1..=10, got {value}")]
    DifficultyOutOfRange { value: usize },
    #[display("size cap of difficulty level {level} must be at least 1")]
    ZeroSizeCap { level: usize },
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum WeightsError {
    #[display("expected {expected} shape weights, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[display("shape weight #{index} must be a non-negative number, got {value}")]
    InvalidWeight { index: usize, value: f64 },
}
