use std::{collections::BTreeMap, path::Path};

use anyhow::Context as _;
use blockharness_dda::{RampStep, TrayConfig, TrayGenerator, TraySeed};
use blockharness_engine::{Board, DEFAULT_BOARD_SIZE, ShapeCatalog};
use blockharness_evaluator::{MetricsConfig, MetricsEngine};
use serde::{Deserialize, Serialize};

use crate::{model::session::GameSession, util};

/// Shape name to filler weight. Shapes that are not listed weigh 1.
pub type ShapeWeights = BTreeMap<String, f64>;

/// Filler weights that take over once the score reaches `score`, used by the
/// `threshold` tray algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyThreshold {
    pub score: usize,
    pub weights: ShapeWeights,
}

/// Harness configuration, read from a JSON file.
///
/// Every field is optional:
///
/// ```json
/// {
///   "rows": 8,
///   "cols": 8,
///   "shape_weights": { "1x1-square": 2, "3x3-square": 0.5 },
///   "difficulty_thresholds": [{ "score": 1000, "weights": { "1x1-square": 1 } }],
///   "metrics": { "low_clear_threshold": 0.3 },
///   "dda": { "algorithm": "opportunity", "tray_size": 3, "score_threshold": 1000 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub rows: usize,
    pub cols: usize,
    /// Custom catalog; the built-in shapes when absent.
    pub shapes: Option<ShapeCatalog>,
    pub shape_weights: ShapeWeights,
    pub difficulty_thresholds: Vec<DifficultyThreshold>,
    pub metrics: MetricsConfig,
    pub dda: TrayConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_BOARD_SIZE,
            cols: DEFAULT_BOARD_SIZE,
            shapes: None,
            shape_weights: ShapeWeights::new(),
            difficulty_thresholds: vec![],
            metrics: MetricsConfig::default(),
            dda: TrayConfig::default(),
        }
    }
}

impl HarnessConfig {
    pub fn load<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let config: Self = util::read_json_file("config", path)?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        Board::new(self.rows, self.cols)?;
        self.metrics.validate().context("Invalid metrics section")?;
        self.dda.validate().context("Invalid dda section")?;

        let catalog = self.catalog();
        resolve_weights(&catalog, &self.shape_weights).context("Invalid shape_weights")?;
        for threshold in &self.difficulty_thresholds {
            resolve_weights(&catalog, &threshold.weights).with_context(|| {
                format!("Invalid difficulty threshold at score {}", threshold.score)
            })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn catalog(&self) -> ShapeCatalog {
        self.shapes.clone().unwrap_or_default()
    }

    /// Builds a fresh game with this configuration.
    pub fn new_session(&self, seed: TraySeed) -> anyhow::Result<GameSession> {
        let catalog = self.catalog();
        let board = Board::new(self.rows, self.cols)?;
        let ramp = self
            .difficulty_thresholds
            .iter()
            .map(|threshold| {
                Ok(RampStep {
                    score: threshold.score,
                    weights: resolve_weights(&catalog, &threshold.weights)?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let generator =
            TrayGenerator::new(&catalog, resolve_weights(&catalog, &self.shape_weights)?, seed)?
                .with_difficulty_ramp(ramp)?;
        Ok(GameSession::new(
            board,
            catalog,
            MetricsEngine::new(self.metrics),
            generator,
            self.dda,
        ))
    }
}

/// Expands a weight map to one weight per catalog shape, in catalog order.
pub fn resolve_weights(
    catalog: &ShapeCatalog,
    weights: &ShapeWeights,
) -> anyhow::Result<Vec<f64>> {
    let mut resolved = vec![1.0; catalog.len()];
    for (name, weight) in weights {
        let id = catalog.require(name)?;
        if !weight.is_finite() || *weight < 0.0 {
            anyhow::bail!("weight of `{name}` must be a non-negative number, got {weight}");
        }
        resolved[id.index()] = *weight;
    }
    Ok(resolved)
}
