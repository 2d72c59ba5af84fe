//! Client-local engine: one board plus its wall-clock effects
//!
//! [`LocalEngine`] owns a [`GameState`] and feeds it simulation ticks, player
//! actions, incoming garbage and wall-clock advances. Anything the rest of the
//! client must react to (attacks to send, game over, sprint finish) lands in
//! an outbox drained by the caller.

use tetris_battle_core::{BoardSnapshot, CoreEvent, GameMode, GameState, Input};
use tetris_battle_types::{GameAction, ATTACK_HOLES_PER_LINE, BOARD_HEIGHT, LEVEL_UP_INTERVAL_MS};

use crate::hazard::{HazardClock, HazardConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Rows cleared by one lock; drives `lineCleared`
    LinesCleared { count: u32 },
    LevelUp { level: u32 },
    GameOver { score: u32 },
    SprintCompleted { lines: u32, elapsed_ms: u64 },
}

#[derive(Debug, Clone)]
pub struct LocalEngine {
    state: GameState,
    hazards: HazardClock,
    elapsed_ms: u64,
    level_timer_ms: u32,
    outbox: Vec<EngineEvent>,
}

impl LocalEngine {
    pub fn new(seed: u32, mode: GameMode, hazards: HazardConfig) -> Self {
        Self {
            state: GameState::new(seed, mode),
            hazards: HazardClock::new(hazards),
            elapsed_ms: 0,
            level_timer_ms: 0,
            outbox: Vec::new(),
        }
    }

    pub fn battle(seed: u32) -> Self {
        Self::new(seed, GameMode::Battle, HazardConfig::none())
    }

    pub fn sprint(seed: u32) -> Self {
        Self::new(seed, GameMode::sprint(), HazardConfig::none())
    }

    /// Fresh round with the same mode and hazards
    pub fn restart(&mut self, seed: u32) {
        *self = Self::new(seed, self.state.mode(), self.hazards.config());
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn mode(&self) -> GameMode {
        self.state.mode()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn hazards(&self) -> HazardConfig {
        self.hazards.config()
    }

    /// The wall clock only advances while the round is live and unpaused
    pub fn clock_running(&self) -> bool {
        self.state.is_running() && !self.state.paused()
    }

    pub fn is_finished(&self) -> bool {
        !self.state.is_running()
    }

    /// One fixed simulation step
    pub fn tick(&mut self, dt_ms: u32) {
        self.apply(Input::Tick { dt_ms });
    }

    pub fn act(&mut self, action: GameAction) {
        self.apply(Input::Action(action));
    }

    /// Garbage sent by an opponent
    pub fn receive_garbage(&mut self, lines: u32) {
        if lines == 0 {
            return;
        }
        let lines = lines.min(BOARD_HEIGHT as u32) as u8;
        self.apply(Input::Garbage {
            lines,
            holes: ATTACK_HOLES_PER_LINE,
        });
    }

    /// Advance wall-clock time: elapsed time, level cadence and hazards
    pub fn clock(&mut self, dt_ms: u32) {
        if !self.clock_running() {
            return;
        }
        self.elapsed_ms += u64::from(dt_ms);

        if self.state.mode() == GameMode::Battle {
            self.level_timer_ms = self.level_timer_ms.saturating_add(dt_ms);
            while self.level_timer_ms >= LEVEL_UP_INTERVAL_MS {
                self.level_timer_ms -= LEVEL_UP_INTERVAL_MS;
                self.apply(Input::LevelUp);
                self.outbox.push(EngineEvent::LevelUp {
                    level: self.state.level(),
                });
            }
        }

        let effects = self.hazards.advance(dt_ms);
        if let Some((lines, holes)) = effects.garbage {
            self.apply(Input::Garbage { lines, holes });
        }
    }

    /// Wire snapshot of the board, with the blind flag applied
    pub fn snapshot(&self) -> BoardSnapshot {
        let mut snapshot = BoardSnapshot::from_state(&self.state);
        snapshot.hidden = self.hazards.hidden();
        snapshot
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn apply(&mut self, input: Input) {
        self.state = self.state.update(input);
        for event in self.state.events() {
            match *event {
                CoreEvent::Locked { .. } => {}
                CoreEvent::LinesCleared { count, .. } => {
                    self.outbox.push(EngineEvent::LinesCleared { count })
                }
                CoreEvent::GameOver { score } => self.outbox.push(EngineEvent::GameOver { score }),
                CoreEvent::SprintCompleted { lines } => {
                    self.outbox.push(EngineEvent::SprintCompleted {
                        lines,
                        elapsed_ms: self.elapsed_ms,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetris_battle_core::{ghost_y, Board};
    use tetris_battle_types::{GARBAGE_CELL, START_LEVEL};

    #[test]
    fn battle_levels_up_every_five_seconds() {
        let mut engine = LocalEngine::battle(1);
        for _ in 0..4 {
            engine.clock(1000);
        }
        assert_eq!(engine.state().level(), START_LEVEL);
        engine.clock(1000);
        assert_eq!(engine.state().level(), START_LEVEL + 1);
        assert_eq!(
            engine.drain_events(),
            vec![EngineEvent::LevelUp {
                level: START_LEVEL + 1
            }]
        );
        assert_eq!(engine.state().drop_interval_ms(), 400);
    }

    #[test]
    fn sprint_never_levels_up() {
        let mut engine = LocalEngine::sprint(1);
        for _ in 0..30 {
            engine.clock(1000);
        }
        assert_eq!(engine.state().level(), START_LEVEL);
        assert_eq!(engine.elapsed_ms(), 30_000);
    }

    #[test]
    fn paused_clock_does_not_advance() {
        let mut engine = LocalEngine::battle(1);
        engine.act(GameAction::Pause);
        assert!(!engine.clock_running());
        engine.clock(10_000);
        assert_eq!(engine.elapsed_ms(), 0);
        assert_eq!(engine.state().level(), START_LEVEL);

        engine.act(GameAction::Pause);
        engine.clock(1000);
        assert_eq!(engine.elapsed_ms(), 1000);
    }

    #[test]
    fn received_garbage_lands_at_bottom() {
        let mut engine = LocalEngine::battle(3);
        engine.receive_garbage(2);
        let grid = engine.snapshot().grid;
        for row in &grid[18..] {
            assert_eq!(row.iter().filter(|&&c| c == GARBAGE_CELL).count(), 9);
        }
        assert!(grid[17].iter().all(|&c| c == 0));
    }

    #[test]
    fn scorching_hazard_injects_on_clock() {
        let mut engine = LocalEngine::new(5, GameMode::Battle, HazardConfig::scorching());
        for _ in 0..4 {
            engine.clock(1000);
        }
        let bottom = engine.snapshot().grid[19];
        assert_eq!(bottom.iter().filter(|&&c| c == 0).count(), 2);
    }

    #[test]
    fn blackout_sets_hidden_flag() {
        let mut engine = LocalEngine::new(5, GameMode::Battle, HazardConfig::blackout());
        engine.clock(10_000);
        assert!(engine.snapshot().hidden);
        engine.clock(2000);
        assert!(!engine.snapshot().hidden);
    }

    #[test]
    fn hard_drop_clear_reports_lines() {
        let mut engine = LocalEngine::battle(9);
        let piece = engine.state().active().unwrap();
        let landed = piece.shifted(0, ghost_y(&piece, &Board::new()) - piece.y);

        // Bottom row full except exactly where the piece will land
        let mut rows = [[0u8; 10]; 20];
        rows[19] = [1; 10];
        for (x, y) in landed.cells() {
            if y == 19 {
                rows[19][x as usize] = 0;
            }
        }
        engine.state = engine.state.clone().with_board(Board::from_rows(&rows));

        engine.act(GameAction::HardDrop);
        assert!(engine
            .drain_events()
            .contains(&EngineEvent::LinesCleared { count: 1 }));
        assert_eq!(engine.state().score(), 100);
    }

    #[test]
    fn restart_keeps_mode_and_hazards() {
        let mut engine = LocalEngine::new(5, GameMode::sprint(), HazardConfig::scorching());
        engine.clock(3000);
        engine.restart(6);
        assert_eq!(engine.mode(), GameMode::sprint());
        assert_eq!(engine.hazards(), HazardConfig::scorching());
        assert_eq!(engine.elapsed_ms(), 0);
    }
}
