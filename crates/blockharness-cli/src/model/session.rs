use std::time::Duration;

use blockharness_dda::{TrayConfig, TrayGenerator, TrayKind};
use blockharness_engine::{Board, GameStats, PlacementError, Position, ShapeCatalog, ShapeId};
use blockharness_evaluator::{MetricsEngine, MetricsSnapshot, PlayerMetrics, player::MoveOutcome};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum MoveError {
    #[display("preview slot {index} is empty")]
    NoSuchSlot { index: usize },
    #[display("{_0}")]
    Placement(PlacementError),
}

/// Number of trays handed out, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrayCounts {
    pub filler: usize,
    pub helper: usize,
    pub killer: usize,
}

impl TrayCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.filler + self.helper + self.killer
    }

    fn count(&mut self, kind: TrayKind) {
        match kind {
            TrayKind::Filler => self.filler += 1,
            TrayKind::Helper => self.helper += 1,
            TrayKind::Killer => self.killer += 1,
        }
    }
}

/// One game: the board, the preview tray and everything the tray generator
/// learns about the player.
#[derive(Debug, Clone)]
pub struct GameSession {
    board: Board,
    initial_board: Board,
    catalog: ShapeCatalog,
    preview: Vec<ShapeId>,
    stats: GameStats,
    player: PlayerMetrics,
    engine: MetricsEngine,
    generator: TrayGenerator,
    tray_config: TrayConfig,
    tray_counts: TrayCounts,
}

impl GameSession {
    /// Starts a game on `board` and deals the first tray.
    #[must_use]
    pub fn new(
        board: Board,
        catalog: ShapeCatalog,
        engine: MetricsEngine,
        generator: TrayGenerator,
        tray_config: TrayConfig,
    ) -> Self {
        let mut session = Self {
            initial_board: board.clone(),
            board,
            catalog,
            preview: vec![],
            stats: GameStats::new(),
            player: PlayerMetrics::new(),
            engine,
            generator,
            tray_config,
            tray_counts: TrayCounts::default(),
        };
        session.refill_tray();
        session
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn catalog(&self) -> &ShapeCatalog {
        &self.catalog
    }

    /// Shapes still waiting in the tray, in slot order.
    #[must_use]
    pub fn preview(&self) -> &[ShapeId] {
        &self.preview
    }

    #[must_use]
    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    /// Everything recorded about the player's moves so far.
    #[must_use]
    pub fn player(&self) -> &PlayerMetrics {
        &self.player
    }

    #[must_use]
    pub fn tray_counts(&self) -> TrayCounts {
        self.tray_counts
    }

    #[must_use]
    pub fn tray_config(&self) -> &TrayConfig {
        &self.tray_config
    }

    /// Metrics of the current board, preview and player.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.engine
            .snapshot(&self.board, &self.catalog, &self.preview, &self.player)
    }

    /// Plays the shape in preview slot `preview_index` at `position` and
    /// returns the number of cleared lines.
    ///
    /// A shape that does not fit counts as a mistake; an empty slot does not.
    pub fn try_place(
        &mut self,
        preview_index: usize,
        position: Position,
        elapsed: Duration,
    ) -> Result<usize, MoveError> {
        let Some(&shape_id) = self.preview.get(preview_index) else {
            return Err(MoveError::NoSuchSlot {
                index: preview_index,
            });
        };
        let shape = &self.catalog[shape_id];
        let lines_cleared = match self
            .board
            .place_and_clear(shape, position.row(), position.col())
        {
            Ok(lines) => lines,
            Err(err) => {
                self.player.record_mistake();
                log::debug!("rejected move: {err}");
                return Err(MoveError::Placement(err));
            }
        };

        let points = self.stats.complete_move(lines_cleared);
        self.player.record_move(MoveOutcome {
            lines_cleared,
            points,
            elapsed,
        });
        self.preview.remove(preview_index);
        if self.preview.is_empty() {
            self.refill_tray();
        }
        Ok(lines_cleared)
    }

    /// No shape left in the preview fits anywhere on the board.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        !self
            .preview
            .iter()
            .any(|id| self.board.can_place_anywhere(&self.catalog[*id]))
    }

    /// Starts a new game on the initial board, keeping the configuration.
    ///
    /// Score, player history, tray counts and the generator state start from
    /// scratch and a new first tray is dealt. The generator's random stream
    /// is not rewound.
    pub fn restart(&mut self) {
        self.board = self.initial_board.clone();
        self.stats = GameStats::new();
        self.player = PlayerMetrics::new();
        self.generator.reset();
        self.tray_counts = TrayCounts::default();
        self.preview.clear();
        self.refill_tray();
    }

    fn refill_tray(&mut self) {
        let snapshot = self.snapshot();
        let tray = self.generator.next_tray(&snapshot, &self.tray_config);
        log::debug!(
            "tray {} ({}): {}",
            self.generator.state().tray_index(),
            tray.kind,
            tray.shapes
                .iter()
                .map(|id| self.catalog.name(*id))
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.tray_counts.count(tray.kind);
        self.preview = tray.shapes;
    }
}

#[cfg(test)]
mod tests {
    use blockharness_dda::TraySeed;
    use blockharness_engine::Shape;

    use super::*;

    fn session(board: Board, shapes: Vec<Shape>) -> GameSession {
        let catalog = ShapeCatalog::new(shapes).unwrap();
        let generator = TrayGenerator::uniform(&catalog, TraySeed::from([7; 16]));
        GameSession::new(
            board,
            catalog,
            MetricsEngine::default(),
            generator,
            TrayConfig::default(),
        )
    }

    fn square() -> Shape {
        Shape::new("2x2", [(0, 0), (0, 1), (1, 0), (1, 1)]).unwrap()
    }

    fn single() -> Shape {
        Shape::new("1x1", [(0, 0)]).unwrap()
    }

    #[test]
    fn test_game_over_after_blocking_move() {
        let mut session = session(Board::new(3, 3).unwrap(), vec![square()]);
        assert_eq!(session.preview().len(), 3);
        assert!(!session.is_game_over());

        let lines = session
            .try_place(0, Position::new(0, 0), Duration::from_secs(1))
            .unwrap();
        assert_eq!(lines, 0);
        assert_eq!(session.preview().len(), 2);
        assert_eq!(session.board().filled_count(), 4);
        assert!(session.is_game_over());
        assert_eq!(session.stats().blocks_placed(), 1);
    }

    #[test]
    fn test_rejected_placement_is_a_mistake() {
        let mut session = session(Board::new(3, 3).unwrap(), vec![square()]);
        let err = session
            .try_place(0, Position::new(2, 2), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, MoveError::Placement(_)));
        assert_eq!(session.player().mistake_count(), 1);
        assert_eq!(session.player().move_count(), 0);
        assert_eq!(session.preview().len(), 3);
        assert_eq!(session.board().filled_count(), 0);
    }

    #[test]
    fn test_empty_slot_is_not_a_mistake() {
        let mut session = session(Board::new(3, 3).unwrap(), vec![square()]);
        assert_eq!(
            session.try_place(5, Position::new(0, 0), Duration::ZERO),
            Err(MoveError::NoSuchSlot { index: 5 })
        );
        assert_eq!(session.player().mistake_count(), 0);
    }

    #[test]
    fn test_tray_is_refilled_when_empty() {
        let mut session = session(Board::default(), vec![single()]);
        for col in 0..3 {
            session
                .try_place(0, Position::new(0, col), Duration::from_secs(2))
                .unwrap();
        }
        assert_eq!(session.preview().len(), 3);
        assert_eq!(session.tray_counts().total(), 2);
        assert_eq!(session.player().move_count(), 3);
        assert_eq!(session.snapshot().move_count, 3);
    }

    #[test]
    fn test_line_clear_updates_score() {
        let mut session = session(Board::from_ascii("##.\n...\n...\n").unwrap(), vec![single()]);
        let lines = session
            .try_place(0, Position::new(0, 2), Duration::from_secs(1))
            .unwrap();
        assert_eq!(lines, 1);
        assert!(session.stats().score() > 0);
        assert_eq!(session.player().lines_cleared_total(), 1);
        assert_eq!(session.board().filled_count(), 0);
    }

    #[test]
    fn test_restart_resets_the_game() {
        let initial = Board::from_ascii("#..\n...\n...\n").unwrap();
        let mut session = session(initial.clone(), vec![single()]);
        session
            .try_place(0, Position::new(1, 1), Duration::from_secs(1))
            .unwrap();
        let _ = session.try_place(0, Position::new(0, 0), Duration::from_secs(1));
        session.restart();

        assert_eq!(session.board(), &initial);
        assert_eq!(session.stats().blocks_placed(), 0);
        assert_eq!(session.player().move_count(), 0);
        assert_eq!(session.player().mistake_count(), 0);
        assert_eq!(session.preview().len(), 3);
        assert_eq!(session.tray_counts().total(), 1);
        assert_eq!(session.generator.state().tray_index(), 1);
    }
}
