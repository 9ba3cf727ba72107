use blockharness_engine::{ShapeCatalog, ShapeId};
use blockharness_evaluator::{MetricsSnapshot, board_metrics::Phase, player::EmotionalState};
use rand::{
    SeedableRng as _,
    distr::{Distribution as _, weighted::WeightedIndex},
    seq::IndexedRandom as _,
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{DdaAlgorithm, MAX_DIFFICULTY, MIN_DIFFICULTY, TrayConfig, TraySeed, WeightsError};

/// Largest shape allowed by metrics-driven trays during the early phase.
const EARLY_SIZE_CAP: usize = 3;
/// Weights of the smallest shapes in an emergency tray, smallest first.
const EMERGENCY_WEIGHTS: [f64; 2] = [10.0, 5.0];
/// Number of smallest shapes a rescue tray draws from.
const RESCUE_SHAPES: usize = 3;

/// What a generated tray was built for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
#[serde(rename_all = "lowercase")]
pub enum TrayKind {
    /// Weighted random shapes only.
    #[display("filler")]
    Filler,
    /// Carries shapes meant to help: best-fit copies, rescue or emergency
    /// shapes.
    #[display("helper")]
    Helper,
    /// Carries shapes meant to hurt: game-over copies or awkward shapes.
    #[display("killer")]
    Killer,
}

/// Mode of the metrics-driven algorithm for the latest tray.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum MetricsMode {
    /// Shapes capped by the current difficulty level.
    #[default]
    #[display("normal")]
    Normal,
    /// The danger score reached the cut; only the smallest shapes.
    #[display("rescue")]
    Rescue,
    /// A previewed shape fits nowhere; heavily weighted single cells.
    #[display("emergency")]
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tray {
    pub shapes: Vec<ShapeId>,
    pub kind: TrayKind,
}

/// Replaces the filler distribution once the score reaches `score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RampStep {
    pub score: usize,
    pub weights: Vec<f64>,
}

/// Mutable per-game state of a [`TrayGenerator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrayGeneratorState {
    tray_index: usize,
    last_tray: Vec<ShapeId>,
    weights: Vec<f64>,
    above_threshold: bool,
    ramp_steps_applied: usize,
    difficulty_level: Option<usize>,
    metrics_mode: MetricsMode,
}

impl TrayGeneratorState {
    fn new(weights: Vec<f64>) -> Self {
        Self {
            tray_index: 0,
            last_tray: vec![],
            weights,
            above_threshold: false,
            ramp_steps_applied: 0,
            difficulty_level: None,
            metrics_mode: MetricsMode::Normal,
        }
    }

    /// Number of trays generated so far.
    #[must_use]
    pub fn tray_index(&self) -> usize {
        self.tray_index
    }

    /// Shapes of the latest tray.
    #[must_use]
    pub fn last_tray(&self) -> &[ShapeId] {
        &self.last_tray
    }

    /// Current filler distribution, indexed by catalog order.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// The score threshold has been reached at some point in this game.
    #[must_use]
    pub fn above_threshold(&self) -> bool {
        self.above_threshold
    }

    /// Difficulty level of the metrics-driven algorithm, once it has run.
    #[must_use]
    pub fn difficulty_level(&self) -> Option<usize> {
        self.difficulty_level
    }

    #[must_use]
    pub fn metrics_mode(&self) -> MetricsMode {
        self.metrics_mode
    }
}

/// Chooses the shapes of each new tray from the latest metrics snapshot.
///
/// # Example
///
/// ```
/// use blockharness_dda::{TrayConfig, TrayGenerator};
/// use blockharness_engine::{Board, ShapeCatalog};
/// use blockharness_evaluator::{MetricsEngine, PlayerMetrics};
/// use rand::Rng as _;
///
/// let catalog = ShapeCatalog::builtin();
/// let mut generator = TrayGenerator::uniform(&catalog, rand::rng().random());
/// let snapshot =
///     MetricsEngine::default().snapshot(&Board::default(), &catalog, &[], &PlayerMetrics::new());
///
/// // A fresh player has a clear rate of 0, so every tray is a helper tray.
/// let tray = generator.next_tray(&snapshot, &TrayConfig::default());
/// assert!(tray.kind.is_helper());
/// assert_eq!(tray.shapes.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct TrayGenerator {
    rng: Pcg32,
    ids: Vec<ShapeId>,
    cell_counts: Vec<usize>,
    /// Catalog ordered by cell count, ties in catalog order.
    smallest: Vec<ShapeId>,
    /// Shapes that do not fill their bounding box, in catalog order.
    awkward: Vec<ShapeId>,
    base_weights: Vec<f64>,
    ramp: Vec<RampStep>,
    state: TrayGeneratorState,
}

fn check_weights(expected: usize, weights: &[f64]) -> Result<(), WeightsError> {
    if weights.len() != expected {
        return Err(WeightsError::LengthMismatch {
            expected,
            actual: weights.len(),
        });
    }
    if let Some((index, value)) = weights
        .iter()
        .copied()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || *w < 0.0)
    {
        return Err(WeightsError::InvalidWeight { index, value });
    }
    Ok(())
}

impl TrayGenerator {
    /// Creates a generator drawing fillers with `weights`, one per catalog
    /// shape in catalog order.
    pub fn new(
        catalog: &ShapeCatalog,
        weights: Vec<f64>,
        seed: TraySeed,
    ) -> Result<Self, WeightsError> {
        check_weights(catalog.len(), &weights)?;
        let cell_counts: Vec<_> = catalog.iter().map(|(_, shape)| shape.cell_count()).collect();
        let mut smallest: Vec<_> = catalog.ids().collect();
        smallest.sort_by_key(|id| cell_counts[id.index()]);
        let awkward = catalog
            .iter()
            .filter(|(_, shape)| shape.cell_count() < shape.height() * shape.width())
            .map(|(id, _)| id)
            .collect();
        Ok(Self {
            rng: Pcg32::from_seed(seed.to_bytes()),
            ids: catalog.ids().collect(),
            cell_counts,
            smallest,
            awkward,
            base_weights: weights.clone(),
            ramp: vec![],
            state: TrayGeneratorState::new(weights),
        })
    }

    /// Like [`Self::new`], with every shape equally likely.
    #[must_use]
    pub fn uniform(catalog: &ShapeCatalog, seed: TraySeed) -> Self {
        let weights = vec![1.0; catalog.len()];
        match Self::new(catalog, weights, seed) {
            Ok(generator) => generator,
            Err(err) => unreachable!("uniform weights are valid: {err}"),
        }
    }

    /// Adds score steps that replace the filler distribution of
    /// [`DdaAlgorithm::Threshold`].
    ///
    /// Steps are applied in ascending score order, each at most once per game.
    pub fn with_difficulty_ramp(mut self, mut steps: Vec<RampStep>) -> Result<Self, WeightsError> {
        for step in &steps {
            check_weights(self.ids.len(), &step.weights)?;
        }
        steps.sort_by_key(|step| step.score);
        self.ramp = steps;
        Ok(self)
    }

    #[must_use]
    pub fn state(&self) -> &TrayGeneratorState {
        &self.state
    }

    /// Forgets everything learned during the current game.
    ///
    /// The random stream continues, so a restarted game sees new trays.
    pub fn reset(&mut self) {
        self.state = TrayGeneratorState::new(self.base_weights.clone());
    }

    /// Builds the next tray of `config.tray_size` shapes with the algorithm
    /// selected in `config`.
    ///
    /// `snapshot` must describe the board and player the tray is meant for.
    /// The tray is remembered so that the fillers of the following tray can
    /// avoid its shapes.
    pub fn next_tray(&mut self, snapshot: &MetricsSnapshot, config: &TrayConfig) -> Tray {
        self.state.tray_index += 1;
        let tray = match config.algorithm {
            DdaAlgorithm::Static => self.static_tray(config),
            DdaAlgorithm::Threshold => self.threshold_tray(snapshot, config),
            DdaAlgorithm::Interval => self.interval_tray(config),
            DdaAlgorithm::Metrics => self.metrics_tray(snapshot, config),
            DdaAlgorithm::Opportunity => self.opportunity_tray(snapshot, config),
        };

        log::debug!(
            "tray {} ({}): {} (clear rate {:.2}, score {}) -> {:?}",
            self.state.tray_index,
            config.algorithm,
            tray.kind,
            snapshot.clear_rate,
            snapshot.score,
            tray.shapes.iter().map(|id| id.index()).collect::<Vec<_>>()
        );
        self.state.last_tray.clone_from(&tray.shapes);
        tray
    }

    fn static_tray(&mut self, config: &TrayConfig) -> Tray {
        let mut shapes = Vec::with_capacity(config.tray_size);
        self.fill(&mut shapes, &self.base_weights.clone(), None, config.tray_size);
        Tray {
            shapes,
            kind: TrayKind::Filler,
        }
    }

    fn threshold_tray(&mut self, snapshot: &MetricsSnapshot, config: &TrayConfig) -> Tray {
        self.apply_ramp(snapshot.score);
        let mut shapes = Vec::with_capacity(config.tray_size);
        self.fill(&mut shapes, &self.state.weights.clone(), None, config.tray_size);
        Tray {
            shapes,
            kind: TrayKind::Filler,
        }
    }

    fn interval_tray(&mut self, config: &TrayConfig) -> Tray {
        let interval = &config.interval;
        let index = self.state.tray_index;
        let mut shapes = Vec::with_capacity(config.tray_size);

        let mut kind = TrayKind::Filler;
        if index % interval.steps_to_rescue == 0 && interval.rescue_count > 0 {
            shapes.extend(self.smallest.iter().take(interval.rescue_count));
            kind = TrayKind::Helper;
        }
        let awkward_due = index > 1 && index % interval.steps_to_awkward == 0;
        if awkward_due && interval.awkward_count > 0 && !self.awkward.is_empty() {
            shapes.extend(self.awkward.iter().take(interval.awkward_count));
            if kind.is_filler() {
                kind = TrayKind::Killer;
            }
        }
        shapes.truncate(config.tray_size);

        self.fill(&mut shapes, &self.state.weights.clone(), None, config.tray_size);
        Tray { shapes, kind }
    }

    fn metrics_tray(&mut self, snapshot: &MetricsSnapshot, config: &TrayConfig) -> Tray {
        let danger = snapshot.board.danger_score;
        let (mode, weights) = if snapshot.imminent_threat {
            (
                MetricsMode::Emergency,
                self.smallest_weights(&EMERGENCY_WEIGHTS),
            )
        } else if danger >= config.metrics.danger_cut {
            (
                MetricsMode::Rescue,
                self.smallest_weights(&[1.0; RESCUE_SHAPES]),
            )
        } else {
            let level = self.adjust_difficulty(snapshot, config);
            let mut cap = config.metrics.size_cap(level);
            if snapshot.phase == Phase::Early {
                cap = cap.min(EARLY_SIZE_CAP);
            }
            let weights = self
                .state
                .weights
                .iter()
                .zip(&self.cell_counts)
                .map(|(weight, cells)| if *cells <= cap { *weight } else { 0.0 })
                .collect();
            (MetricsMode::Normal, weights)
        };
        if mode != self.state.metrics_mode {
            log::debug!(
                "tray {}: metrics mode {} -> {mode} (danger {danger:.2})",
                self.state.tray_index,
                self.state.metrics_mode
            );
        }
        self.state.metrics_mode = mode;

        let mut shapes = Vec::with_capacity(config.tray_size);
        self.fill(&mut shapes, &weights, None, config.tray_size);
        let kind = match mode {
            MetricsMode::Normal => TrayKind::Filler,
            MetricsMode::Rescue | MetricsMode::Emergency => TrayKind::Helper,
        };
        Tray { shapes, kind }
    }

    fn opportunity_tray(&mut self, snapshot: &MetricsSnapshot, config: &TrayConfig) -> Tray {
        if !self.state.above_threshold && snapshot.score >= config.score_threshold {
            self.state.above_threshold = true;
            log::debug!(
                "tray {}: score {} reached threshold {}",
                self.state.tray_index,
                snapshot.score,
                config.score_threshold
            );
        }

        let tray_size = config.tray_size;
        let injection = if self.state.above_threshold {
            snapshot
                .game_over_block
                .map(|shape| (shape, config.n_game_over.min(tray_size), TrayKind::Killer))
        } else {
            let interval = config.injection_interval(snapshot.clear_rate);
            if self.state.tray_index % interval == 0 {
                snapshot
                    .best_fit
                    .map(|fit| (fit.shape, config.n_best_fit.min(tray_size), TrayKind::Helper))
            } else {
                None
            }
        };
        let injection = injection.filter(|(_, copies, _)| *copies > 0);

        let mut shapes = Vec::with_capacity(tray_size);
        let mut kind = TrayKind::Filler;
        let mut injected = None;
        if let Some((shape, copies, injected_kind)) = injection {
            shapes.extend(std::iter::repeat_n(shape, copies));
            kind = injected_kind;
            injected = Some(shape);
        }
        self.fill(&mut shapes, &self.state.weights.clone(), injected, tray_size);
        Tray { shapes, kind }
    }

    /// Moves the metrics-driven difficulty level by one step per signal and
    /// returns the new level.
    fn adjust_difficulty(&mut self, snapshot: &MetricsSnapshot, config: &TrayConfig) -> usize {
        let previous = self
            .state
            .difficulty_level
            .unwrap_or(config.metrics.initial_difficulty);
        let down = |level: usize, steps: usize| level.saturating_sub(steps).max(MIN_DIFFICULTY);
        let up = |level: usize| (level + 1).min(MAX_DIFFICULTY);

        let mut level = previous;
        if snapshot.clear_rate < config.low_clear_rate {
            level = down(level, 1);
        } else if snapshot.clear_rate > config.high_clear_rate {
            level = up(level);
        }
        match snapshot.emotional_state {
            EmotionalState::Frustrated
                if snapshot.board.danger_score > config.metrics.frustrated_danger =>
            {
                level = down(level, 2);
            }
            EmotionalState::Bored => level = up(level),
            _ => {}
        }

        if level != previous {
            log::debug!("difficulty level {previous} -> {level}");
        }
        self.state.difficulty_level = Some(level);
        level
    }

    /// Weights that only keep the smallest shapes, `boosts[i]` for the
    /// `i`-th smallest.
    fn smallest_weights(&self, boosts: &[f64]) -> Vec<f64> {
        let mut weights = vec![0.0; self.ids.len()];
        for (id, boost) in self.smallest.iter().zip(boosts) {
            weights[id.index()] = *boost;
        }
        weights
    }

    fn apply_ramp(&mut self, score: usize) {
        while let Some(step) = self.ramp.get(self.state.ramp_steps_applied) {
            if score < step.score {
                break;
            }
            log::debug!("score {score} reached ramp step at {}", step.score);
            self.state.weights.clone_from(&step.weights);
            self.state.ramp_steps_applied += 1;
        }
    }

    fn fill(
        &mut self,
        shapes: &mut Vec<ShapeId>,
        weights: &[f64],
        injected: Option<ShapeId>,
        tray_size: usize,
    ) {
        while shapes.len() < tray_size {
            let filler = self.draw_filler(weights, injected, shapes);
            shapes.push(filler);
        }
    }

    /// Draws one filler shape.
    ///
    /// The injected shape is never drawn unless it is the only shape. Shapes
    /// already in this tray and shapes of the previous tray are avoided while
    /// possible; the previous-tray rule is dropped first.
    fn draw_filler(
        &mut self,
        weights: &[f64],
        injected: Option<ShapeId>,
        drawn: &[ShapeId],
    ) -> ShapeId {
        let only_shape = self.ids.len() == 1;
        let last_tray = &self.state.last_tray;
        let allowed = |id: &ShapeId| only_shape || injected != Some(*id);
        let tiers: [Vec<ShapeId>; 3] = [
            self.ids
                .iter()
                .filter(|id| allowed(id) && !drawn.contains(id) && !last_tray.contains(id))
                .copied()
                .collect(),
            self.ids
                .iter()
                .filter(|id| allowed(id) && !drawn.contains(id))
                .copied()
                .collect(),
            self.ids.iter().filter(|id| allowed(id)).copied().collect(),
        ];

        for candidates in &tiers {
            let tier_weights = candidates.iter().map(|id| weights[id.index()]);
            if let Ok(dist) = WeightedIndex::new(tier_weights) {
                return candidates[dist.sample(&mut self.rng)];
            }
        }

        // Every candidate has zero weight.
        let candidates = tiers
            .iter()
            .find(|candidates| !candidates.is_empty())
            .map_or(self.ids.as_slice(), Vec::as_slice);
        candidates.choose(&mut self.rng).copied().unwrap_or(self.ids[0])
    }
}

#[cfg(test)]
mod tests {
    use blockharness_engine::{Board, Position, Shape};
    use blockharness_evaluator::{MetricsEngine, PlayerMetrics, best_fit::BestFit};

    use super::*;
    use crate::{IntervalConfig, MetricsDdaConfig};

    fn catalog(len: usize) -> ShapeCatalog {
        ShapeCatalog::new((0..len).map(|i| Shape::new(format!("s{i}"), [(0, 0)]).unwrap())).unwrap()
    }

    /// One shape per cell count from 1 to 4; only `corner` leaves a hole in
    /// its bounding box.
    fn sized_catalog() -> ShapeCatalog {
        ShapeCatalog::new([
            Shape::new("square", [(0, 0), (0, 1), (1, 0), (1, 1)]).unwrap(),
            Shape::new("corner", [(0, 0), (1, 0), (1, 1)]).unwrap(),
            Shape::new("bar", [(0, 0), (0, 1)]).unwrap(),
            Shape::new("dot", [(0, 0)]).unwrap(),
        ])
        .unwrap()
    }

    fn seed() -> TraySeed {
        TraySeed::from([7; 16])
    }

    fn snapshot(
        catalog: &ShapeCatalog,
        score: usize,
        clear_rate: f64,
        best_fit: Option<ShapeId>,
        game_over_block: Option<ShapeId>,
    ) -> MetricsSnapshot {
        let mut snapshot = MetricsEngine::default().snapshot(
            &Board::default(),
            catalog,
            &[],
            &PlayerMetrics::new(),
        );
        snapshot.score = score;
        snapshot.clear_rate = clear_rate;
        snapshot.best_fit = best_fit.map(|shape| BestFit {
            shape,
            position: Position::new(0, 0),
            lines_cleared: 1,
        });
        snapshot.game_over_block = game_over_block;
        snapshot
    }

    fn count(tray: &Tray, shape: ShapeId) -> usize {
        tray.shapes.iter().filter(|id| **id == shape).count()
    }

    #[test]
    fn test_low_clear_rate_helps_every_tray() {
        let catalog = catalog(6);
        let helper = catalog.id_of("s2").unwrap();
        let config = TrayConfig::default();
        let snapshot = snapshot(&catalog, 0, 0.10, Some(helper), None);
        let mut generator = TrayGenerator::uniform(&catalog, seed());

        for _ in 0..5 {
            let tray = generator.next_tray(&snapshot, &config);
            assert_eq!(tray.kind, TrayKind::Helper);
            assert_eq!(tray.shapes.len(), 3);
            assert_eq!(tray.shapes[0], helper);
            assert_eq!(count(&tray, helper), 1);
        }
        assert_eq!(generator.state().tray_index(), 5);
    }

    #[test]
    fn test_clear_rate_at_low_boundary_helps_every_second_tray() {
        let catalog = catalog(6);
        let helper = catalog.id_of("s0").unwrap();
        let config = TrayConfig::default();
        let snapshot = snapshot(&catalog, 0, config.low_clear_rate, Some(helper), None);
        let mut generator = TrayGenerator::uniform(&catalog, seed());

        let kinds: Vec<_> = (0..4)
            .map(|_| generator.next_tray(&snapshot, &config).kind)
            .collect();
        assert_eq!(
            kinds,
            [
                TrayKind::Filler,
                TrayKind::Helper,
                TrayKind::Filler,
                TrayKind::Helper
            ]
        );
    }

    #[test]
    fn test_high_clear_rate_helps_every_third_tray() {
        let catalog = catalog(6);
        let helper = catalog.id_of("s0").unwrap();
        let config = TrayConfig {
            n_best_fit: 2,
            ..TrayConfig::default()
        };
        let snapshot = snapshot(&catalog, 0, 0.9, Some(helper), None);
        let mut generator = TrayGenerator::uniform(&catalog, seed());

        for index in 1..=6 {
            let tray = generator.next_tray(&snapshot, &config);
            if index % 3 == 0 {
                assert!(tray.kind.is_helper());
                assert_eq!(count(&tray, helper), 2);
            } else {
                assert!(tray.kind.is_filler());
            }
        }
    }

    #[test]
    fn test_no_best_fit_means_filler() {
        let catalog = catalog(6);
        let snapshot = snapshot(&catalog, 0, 0.0, None, None);
        let mut generator = TrayGenerator::uniform(&catalog, seed());
        let tray = generator.next_tray(&snapshot, &TrayConfig::default());
        assert_eq!(tray.kind, TrayKind::Filler);
        assert_eq!(tray.shapes.len(), 3);
    }

    #[test]
    fn test_killer_trays_above_threshold() {
        let catalog = catalog(6);
        let killer = catalog.id_of("s4").unwrap();
        let helper = catalog.id_of("s1").unwrap();
        let config = TrayConfig {
            n_game_over: 2,
            ..TrayConfig::default()
        };
        let snapshot = snapshot(&catalog, 1000, 0.0, Some(helper), Some(killer));
        let mut generator = TrayGenerator::uniform(&catalog, seed());

        for _ in 0..10 {
            let tray = generator.next_tray(&snapshot, &config);
            assert_eq!(tray.kind, TrayKind::Killer);
            assert_eq!(tray.shapes.len(), 3);
            assert_eq!(count(&tray, killer), 2);
        }
    }

    #[test]
    fn test_game_over_block_is_ignored_below_threshold() {
        let catalog = catalog(6);
        let killer = catalog.id_of("s4").unwrap();
        let helper = catalog.id_of("s1").unwrap();
        let config = TrayConfig {
            n_game_over: 3,
            ..TrayConfig::default()
        };
        // The killer never comes up as a filler either.
        let weights = vec![1.0, 1.0, 1.0, 1.0, 0.0, 1.0];
        let mut generator = TrayGenerator::new(&catalog, weights, seed()).unwrap();

        for clear_rate in [0.0, 0.5, 0.9] {
            let snapshot = snapshot(&catalog, 999, clear_rate, Some(helper), Some(killer));
            for _ in 0..10 {
                let tray = generator.next_tray(&snapshot, &config);
                assert_ne!(tray.kind, TrayKind::Killer);
                assert_eq!(count(&tray, killer), 0);
            }
        }
        assert!(!generator.state().above_threshold());
    }

    #[test]
    fn test_threshold_latch_is_irreversible() {
        let catalog = catalog(6);
        let killer = catalog.id_of("s4").unwrap();
        let helper = catalog.id_of("s1").unwrap();
        let config = TrayConfig::default();
        let mut generator = TrayGenerator::uniform(&catalog, seed());

        generator.next_tray(&snapshot(&catalog, 1500, 0.0, Some(helper), None), &config);
        assert!(generator.state().above_threshold());

        // Score data below the threshold does not bring helper trays back.
        let low = snapshot(&catalog, 10, 0.0, Some(helper), None);
        let tray = generator.next_tray(&low, &config);
        assert_eq!(tray.kind, TrayKind::Filler);

        let low_with_killer = snapshot(&catalog, 10, 0.0, Some(helper), Some(killer));
        let tray = generator.next_tray(&low_with_killer, &config);
        assert_eq!(tray.kind, TrayKind::Killer);
        assert_eq!(count(&tray, killer), 1);

        generator.reset();
        assert!(!generator.state().above_threshold());
        assert_eq!(generator.state().tray_index(), 0);
        assert_eq!(generator.next_tray(&low, &config).kind, TrayKind::Helper);
    }

    #[test]
    fn test_same_seed_same_trays() {
        let catalog = ShapeCatalog::builtin();
        let config = TrayConfig::default();
        let snapshot = snapshot(&catalog, 0, 0.5, catalog.ids().next(), None);
        let mut a = TrayGenerator::uniform(&catalog, seed());
        let mut b = TrayGenerator::uniform(&catalog, seed());
        for _ in 0..20 {
            assert_eq!(
                a.next_tray(&snapshot, &config),
                b.next_tray(&snapshot, &config)
            );
        }
    }

    #[test]
    fn test_fillers_are_distinct_and_avoid_last_tray() {
        let catalog = catalog(6);
        let config = TrayConfig::default();
        let snapshot = snapshot(&catalog, 0, 0.0, None, None);
        let mut generator = TrayGenerator::uniform(&catalog, seed());

        let mut previous: Vec<ShapeId> = vec![];
        for _ in 0..20 {
            let tray = generator.next_tray(&snapshot, &config);
            let mut unique = tray.shapes.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), 3);
            assert!(tray.shapes.iter().all(|id| !previous.contains(id)));
            previous = tray.shapes;
        }
    }

    #[test]
    fn test_fillers_repeat_when_catalog_is_small() {
        let catalog = catalog(2);
        let helper = catalog.id_of("s0").unwrap();
        let config = TrayConfig::default();
        let mut generator = TrayGenerator::uniform(&catalog, seed());

        let tray = generator.next_tray(&snapshot(&catalog, 0, 0.0, Some(helper), None), &config);
        // The helper is excluded from the fillers, leaving one other shape.
        let other = catalog.id_of("s1").unwrap();
        assert_eq!(tray.shapes, [helper, other, other]);

        let single = ShapeCatalog::new([Shape::new("only", [(0, 0)]).unwrap()]).unwrap();
        let only = single.id_of("only").unwrap();
        let mut generator = TrayGenerator::uniform(&single, seed());
        let tray = generator.next_tray(&snapshot(&single, 0, 0.0, Some(only), None), &config);
        assert_eq!(tray.shapes, [only; 3]);
    }

    #[test]
    fn test_weights_steer_fillers() {
        let catalog = catalog(4);
        let config = TrayConfig {
            tray_size: 1,
            ..TrayConfig::default()
        };
        let snapshot = snapshot(&catalog, 0, 0.0, None, None);
        let mut generator =
            TrayGenerator::new(&catalog, vec![0.0, 0.0, 1.0, 0.0], seed()).unwrap();
        for _ in 0..5 {
            // The previous tray rule gives way to the only weighted shape.
            let tray = generator.next_tray(&snapshot, &config);
            assert_eq!(tray.shapes, [catalog.id_of("s2").unwrap()]);
        }

        let mut generator = TrayGenerator::new(&catalog, vec![0.0; 4], seed()).unwrap();
        let tray = generator.next_tray(&snapshot, &TrayConfig::default());
        assert_eq!(tray.shapes.len(), 3);
    }

    #[test]
    fn test_invalid_weights() {
        let catalog = catalog(3);
        assert_eq!(
            TrayGenerator::new(&catalog, vec![1.0; 2], seed()).unwrap_err(),
            WeightsError::LengthMismatch {
                expected: 3,
                actual: 2
            }
        );
        assert!(matches!(
            TrayGenerator::new(&catalog, vec![1.0, -1.0, 1.0], seed()),
            Err(WeightsError::InvalidWeight { index: 1, .. })
        ));
        let ramp = vec![RampStep {
            score: 10,
            weights: vec![1.0],
        }];
        assert!(
            TrayGenerator::uniform(&catalog, seed())
                .with_difficulty_ramp(ramp)
                .is_err()
        );
    }

    #[test]
    fn test_difficulty_ramp_replaces_weights() {
        let catalog = catalog(3);
        let config = TrayConfig {
            algorithm: DdaAlgorithm::Threshold,
            ..TrayConfig::default()
        };
        let ramp = vec![
            RampStep {
                score: 800,
                weights: vec![1.0, 0.0, 0.0],
            },
            RampStep {
                score: 500,
                weights: vec![0.0, 0.0, 1.0],
            },
        ];
        let mut generator = TrayGenerator::uniform(&catalog, seed())
            .with_difficulty_ramp(ramp)
            .unwrap();
        let last = catalog.id_of("s2").unwrap();

        generator.next_tray(&snapshot(&catalog, 100, 0.5, None, None), &config);
        assert_eq!(generator.state().weights(), [1.0, 1.0, 1.0]);

        let tray = generator.next_tray(&snapshot(&catalog, 600, 0.5, None, None), &config);
        assert_eq!(generator.state().weights(), [0.0, 0.0, 1.0]);
        assert_eq!(tray.shapes, [last; 3]);

        generator.next_tray(&snapshot(&catalog, 900, 0.5, None, None), &config);
        assert_eq!(generator.state().weights(), [1.0, 0.0, 0.0]);

        generator.reset();
        assert_eq!(generator.state().weights(), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_ramp_only_drives_threshold_trays() {
        let catalog = catalog(3);
        let ramp = vec![RampStep {
            score: 10,
            weights: vec![0.0, 1.0, 0.0],
        }];
        let mut generator = TrayGenerator::uniform(&catalog, seed())
            .with_difficulty_ramp(ramp)
            .unwrap();
        let tray = generator.next_tray(
            &snapshot(&catalog, 50, 0.5, None, None),
            &TrayConfig::default(),
        );
        assert_eq!(tray.kind, TrayKind::Filler);
        assert_eq!(generator.state().weights(), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_static_trays_ignore_metrics() {
        let catalog = catalog(4);
        let excluded = catalog.id_of("s2").unwrap();
        let config = TrayConfig {
            algorithm: DdaAlgorithm::Static,
            ..TrayConfig::default()
        };
        let snapshot = snapshot(&catalog, 5000, 0.0, Some(excluded), Some(excluded));
        let mut generator =
            TrayGenerator::new(&catalog, vec![1.0, 1.0, 0.0, 1.0], seed()).unwrap();

        for _ in 0..10 {
            let tray = generator.next_tray(&snapshot, &config);
            assert_eq!(tray.kind, TrayKind::Filler);
            assert_eq!(tray.shapes.len(), 3);
            assert_eq!(count(&tray, excluded), 0);
        }
        assert!(!generator.state().above_threshold());
    }

    #[test]
    fn test_interval_trays_follow_their_rhythm() {
        let catalog = sized_catalog();
        let dot = catalog.id_of("dot").unwrap();
        let corner = catalog.id_of("corner").unwrap();
        let config = TrayConfig {
            algorithm: DdaAlgorithm::Interval,
            interval: IntervalConfig {
                steps_to_rescue: 3,
                steps_to_awkward: 2,
                ..IntervalConfig::default()
            },
            ..TrayConfig::default()
        };
        let snapshot = snapshot(&catalog, 0, 0.5, None, None);
        let mut generator = TrayGenerator::uniform(&catalog, seed());

        let trays: Vec<_> = (0..6)
            .map(|_| generator.next_tray(&snapshot, &config))
            .collect();
        let kinds: Vec<_> = trays.iter().map(|tray| tray.kind).collect();
        assert_eq!(
            kinds,
            [
                TrayKind::Filler,
                TrayKind::Killer,
                TrayKind::Helper,
                TrayKind::Killer,
                TrayKind::Filler,
                TrayKind::Helper,
            ]
        );
        assert_eq!(trays[1].shapes[0], corner);
        assert_eq!(trays[2].shapes[0], dot);
        assert_eq!(trays[5].shapes[..2], [dot, corner]);
        assert!(trays.iter().all(|tray| tray.shapes.len() == 3));
    }

    fn metrics_snapshot(catalog: &ShapeCatalog, clear_rate: f64) -> MetricsSnapshot {
        let mut snapshot = snapshot(catalog, 0, clear_rate, None, None);
        snapshot.phase = Phase::Late;
        snapshot.board.danger_score = 0.0;
        snapshot.imminent_threat = false;
        snapshot.emotional_state = EmotionalState::Calm;
        snapshot
    }

    fn metrics_config(initial_difficulty: usize) -> TrayConfig {
        TrayConfig {
            algorithm: DdaAlgorithm::Metrics,
            metrics: MetricsDdaConfig {
                initial_difficulty,
                ..MetricsDdaConfig::default()
            },
            ..TrayConfig::default()
        }
    }

    #[test]
    fn test_metrics_emergency_and_rescue() {
        let catalog = sized_catalog();
        let dot = catalog.id_of("dot").unwrap();
        let bar = catalog.id_of("bar").unwrap();
        let square = catalog.id_of("square").unwrap();
        let config = metrics_config(3);
        let mut generator = TrayGenerator::uniform(&catalog, seed());

        let mut threatened = metrics_snapshot(&catalog, 0.5);
        threatened.imminent_threat = true;
        for _ in 0..5 {
            let tray = generator.next_tray(&threatened, &config);
            assert_eq!(tray.kind, TrayKind::Helper);
            assert!(tray.shapes.iter().all(|id| [dot, bar].contains(id)));
        }
        assert_eq!(generator.state().metrics_mode(), MetricsMode::Emergency);
        assert_eq!(generator.state().difficulty_level(), None);

        let mut dangerous = metrics_snapshot(&catalog, 0.5);
        dangerous.board.danger_score = config.metrics.danger_cut;
        for _ in 0..5 {
            let tray = generator.next_tray(&dangerous, &config);
            assert_eq!(tray.kind, TrayKind::Helper);
            assert_eq!(count(&tray, square), 0);
        }
        assert_eq!(generator.state().metrics_mode(), MetricsMode::Rescue);

        let tray = generator.next_tray(&metrics_snapshot(&catalog, 0.5), &config);
        assert_eq!(tray.kind, TrayKind::Filler);
        assert_eq!(generator.state().metrics_mode(), MetricsMode::Normal);
        assert_eq!(generator.state().difficulty_level(), Some(3));
    }

    #[test]
    fn test_metrics_difficulty_follows_the_player() {
        let catalog = sized_catalog();
        let config = metrics_config(3);
        let mut generator = TrayGenerator::uniform(&catalog, seed());

        let cruising = metrics_snapshot(&catalog, 0.9);
        for _ in 0..10 {
            generator.next_tray(&cruising, &config);
        }
        assert_eq!(generator.state().difficulty_level(), Some(MAX_DIFFICULTY));

        let mut frustrated = metrics_snapshot(&catalog, 0.5);
        frustrated.emotional_state = EmotionalState::Frustrated;
        frustrated.board.danger_score = 0.7;
        generator.next_tray(&frustrated, &config);
        assert_eq!(generator.state().difficulty_level(), Some(8));

        frustrated.clear_rate = 0.0;
        generator.next_tray(&frustrated, &config);
        assert_eq!(generator.state().difficulty_level(), Some(5));

        let mut bored = metrics_snapshot(&catalog, 0.5);
        bored.emotional_state = EmotionalState::Bored;
        generator.next_tray(&bored, &config);
        assert_eq!(generator.state().difficulty_level(), Some(6));

        let struggling = metrics_snapshot(&catalog, 0.1);
        for _ in 0..10 {
            generator.next_tray(&struggling, &config);
        }
        assert_eq!(generator.state().difficulty_level(), Some(MIN_DIFFICULTY));

        generator.reset();
        assert_eq!(generator.state().difficulty_level(), None);
    }

    #[test]
    fn test_metrics_size_cap() {
        let catalog = sized_catalog();
        let square = catalog.id_of("square").unwrap();
        let steady = metrics_snapshot(&catalog, 0.5);

        let mut generator = TrayGenerator::uniform(&catalog, seed());
        let trays: Vec<_> = (0..4)
            .map(|_| generator.next_tray(&steady, &metrics_config(MAX_DIFFICULTY)))
            .collect();
        assert!(trays.iter().any(|tray| count(tray, square) > 0));

        let mut early = steady.clone();
        early.phase = Phase::Early;
        for _ in 0..10 {
            let tray = generator.next_tray(&early, &metrics_config(MAX_DIFFICULTY));
            assert_eq!(count(&tray, square), 0);
        }

        let mut generator = TrayGenerator::uniform(&catalog, seed());
        for _ in 0..10 {
            let tray = generator.next_tray(&steady, &metrics_config(MIN_DIFFICULTY));
            assert_eq!(count(&tray, square), 0);
            assert_eq!(tray.shapes.len(), 3);
        }
    }
}
