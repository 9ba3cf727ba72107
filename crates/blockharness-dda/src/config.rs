use serde::{Deserialize, Serialize};

use crate::TrayConfigError;

/// Lowest level of the metrics-driven difficulty scale.
pub const MIN_DIFFICULTY: usize = 1;
/// Highest level of the metrics-driven difficulty scale.
pub const MAX_DIFFICULTY: usize = 10;

/// Strategy used by [`TrayGenerator`](crate::TrayGenerator) to fill trays.
///
/// Parsed case-insensitively from its variant name (`"metrics"`, `"Static"`).
#[derive(
    Default,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[serde(rename_all = "lowercase")]
pub enum DdaAlgorithm {
    /// Weighted random fillers drawn from the base weights, never adjusted.
    #[display("static")]
    Static,
    /// Fillers whose weights follow the score-based difficulty ramp.
    #[display("threshold")]
    Threshold,
    /// Rescue shapes and awkward shapes at fixed tray intervals.
    #[display("interval")]
    Interval,
    /// Shape sizes steered by the danger score, clear rate and emotional state.
    #[display("metrics")]
    Metrics,
    /// Best-fit shapes below the score threshold, game-over shapes above it.
    #[default]
    #[display("opportunity")]
    Opportunity,
}

/// Parameters of [`DdaAlgorithm::Interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    /// Every `n`-th tray carries rescue shapes.
    pub steps_to_rescue: usize,
    /// Number of rescue shapes, smallest first.
    pub rescue_count: usize,
    /// Every `n`-th tray after the first carries awkward shapes.
    pub steps_to_awkward: usize,
    /// Number of awkward (non-rectangular) shapes, in catalog order.
    pub awkward_count: usize,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            steps_to_rescue: 2,
            rescue_count: 1,
            steps_to_awkward: 2,
            awkward_count: 1,
        }
    }
}

/// Parameters of [`DdaAlgorithm::Metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsDdaConfig {
    /// Difficulty level of a fresh game, within
    /// [`MIN_DIFFICULTY`]`..=`[`MAX_DIFFICULTY`].
    pub initial_difficulty: usize,
    /// Danger score from which trays switch to rescue shapes.
    pub danger_cut: f64,
    /// A frustrated player drops two levels once the danger score exceeds this.
    pub frustrated_danger: f64,
    /// Largest cell count allowed at each difficulty level, lowest level first.
    pub size_caps: [usize; MAX_DIFFICULTY],
}

impl Default for MetricsDdaConfig {
    fn default() -> Self {
        Self {
            initial_difficulty: 3,
            danger_cut: 0.80,
            frustrated_danger: 0.60,
            size_caps: [3, 3, 3, 4, 4, 4, 5, 5, 5, 5],
        }
    }
}

impl MetricsDdaConfig {
    /// Size cap of `level`, clamped to the difficulty scale.
    #[must_use]
    pub fn size_cap(&self, level: usize) -> usize {
        self.size_caps[level.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY) - 1]
    }
}

/// Tray generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrayConfig {
    pub algorithm: DdaAlgorithm,
    pub tray_size: usize,
    /// Copies of the best-fit shape in a helper tray.
    pub n_best_fit: usize,
    /// Copies of the game-over shape in a killer tray.
    pub n_game_over: usize,
    pub score_threshold: usize,
    pub low_clear_rate: f64,
    pub high_clear_rate: f64,
    pub interval: IntervalConfig,
    pub metrics: MetricsDdaConfig,
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            algorithm: DdaAlgorithm::default(),
            tray_size: 3,
            n_best_fit: 1,
            n_game_over: 1,
            score_threshold: 1000,
            low_clear_rate: 0.30,
            high_clear_rate: 0.70,
            interval: IntervalConfig::default(),
            metrics: MetricsDdaConfig::default(),
        }
    }
}

impl TrayConfig {
    pub fn validate(&self) -> Result<(), TrayConfigError> {
        if self.tray_size == 0 {
            return Err(TrayConfigError::EmptyTray);
        }
        for (name, count) in [
            ("n_best_fit", self.n_best_fit),
            ("n_game_over", self.n_game_over),
            ("interval.rescue_count", self.interval.rescue_count),
            ("interval.awkward_count", self.interval.awkward_count),
        ] {
            if count > self.tray_size {
                return Err(TrayConfigError::TooManyInjected {
                    name,
                    count,
                    tray_size: self.tray_size,
                });
            }
        }
        for (name, steps) in [
            ("interval.steps_to_rescue", self.interval.steps_to_rescue),
            ("interval.steps_to_awkward", self.interval.steps_to_awkward),
        ] {
            if steps == 0 {
                return Err(TrayConfigError::ZeroInterval { name });
            }
        }
        for (name, value) in [
            ("low_clear_rate", self.low_clear_rate),
            ("high_clear_rate", self.high_clear_rate),
            ("metrics.danger_cut", self.metrics.danger_cut),
            ("metrics.frustrated_danger", self.metrics.frustrated_danger),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TrayConfigError::RateOutOfRange { name, value });
            }
        }
        if self.low_clear_rate > self.high_clear_rate {
            return Err(TrayConfigError::InvertedRates {
                low: self.low_clear_rate,
                high: self.high_clear_rate,
            });
        }
        let metrics = &self.metrics;
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&metrics.initial_difficulty) {
            return Err(TrayConfigError::DifficultyOutOfRange {
                value: metrics.initial_difficulty,
            });
        }
        if let Some(index) = metrics.size_caps.iter().position(|cap| *cap == 0) {
            return Err(TrayConfigError::ZeroSizeCap { level: index + 1 });
        }
        Ok(())
    }

    /// Helper trays are issued every `n`-th tray while below the score
    /// threshold.
    ///
    /// A clear rate equal to `low_clear_rate` already counts as medium.
    #[must_use]
    pub fn injection_interval(&self, clear_rate: f64) -> usize {
        if clear_rate < self.low_clear_rate {
            1
        } else if clear_rate < self.high_clear_rate {
            2
        } else {
            3
        }
    }
}
