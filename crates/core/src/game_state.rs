//! Game state module - one player's board as an immutable value
//!
//! This module ties together the board, pieces, bag generator, lock delay and
//! scoring. The state never changes in place from the outside: every input goes
//! through [`GameState::update`], which returns the successor state together
//! with the events produced during that step.

use arrayvec::ArrayVec;

use crate::board::{Board, ClearedRows};
use crate::garbage::inject_garbage;
use crate::lock::LockState;
use crate::pieces::{self, Piece};
use crate::rng::{PieceGenerator, SimpleRng};
use crate::scoring::{drop_interval_ms, line_clear_score};
use crate::types::{GameAction, PieceKind, PREVIEW_LEN, SPRINT_TARGET_LINES, START_LEVEL};

/// Seed perturbation so garbage holes do not mirror the bag shuffle
const GARBAGE_SEED_SALT: u32 = 0x9E37_79B9;

/// Upper bound on events emitted by a single step
const MAX_STEP_EVENTS: usize = 4;

/// Events produced by one step
pub type StepEvents = ArrayVec<CoreEvent, MAX_STEP_EVENTS>;

/// Rules that differ between game variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    /// Last-player-standing multiplayer round
    Battle,
    /// Single player race to a line target
    Sprint { target_lines: u32 },
}

impl GameMode {
    pub fn sprint() -> Self {
        GameMode::Sprint {
            target_lines: SPRINT_TARGET_LINES,
        }
    }
}

/// One unit of work for [`GameState::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Simulation time passed
    Tick { dt_ms: u32 },
    /// A player action, applied synchronously
    Action(GameAction),
    /// Penalty rows pushed in from the bottom
    Garbage { lines: u8, holes: u8 },
    /// Raise the level by one (wall-clock cadence lives outside the core)
    LevelUp,
}

/// Something observable that happened during a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// The falling piece became part of the board
    Locked { kind: PieceKind },
    /// One or more rows were cleared by the last lock
    LinesCleared { count: u32, rows: ClearedRows },
    /// The player topped out
    GameOver { score: u32 },
    /// The sprint line target was reached
    SprintCompleted { lines: u32 },
}

/// Complete state of one board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    active: Option<Piece>,
    hold: Option<PieceKind>,
    can_hold: bool,
    next: ArrayVec<PieceKind, PREVIEW_LEN>,
    generator: PieceGenerator,
    garbage_rng: SimpleRng,
    lock: LockState,
    drop_timer_ms: u32,
    mode: GameMode,
    score: u32,
    level: u32,
    lines: u32,
    paused: bool,
    game_over: bool,
    completed: bool,
    events: StepEvents,
}

impl GameState {
    /// Start a fresh round: empty board, first piece already falling
    pub fn new(seed: u32, mode: GameMode) -> Self {
        let mut state = Self {
            board: Board::new(),
            active: None,
            hold: None,
            can_hold: true,
            next: ArrayVec::new(),
            generator: PieceGenerator::new(seed),
            garbage_rng: SimpleRng::new(seed ^ GARBAGE_SEED_SALT),
            lock: LockState::Falling,
            drop_timer_ms: 0,
            mode,
            score: 0,
            level: START_LEVEL,
            lines: 0,
            paused: false,
            game_over: false,
            completed: false,
            events: StepEvents::new(),
        };
        state.spawn_next();
        state
    }

    /// Same state on a different board; the falling piece is re-tested
    pub fn with_board(mut self, board: Board) -> Self {
        self.board = board;
        if let Some(piece) = self.active {
            if self.board.collides(&piece) {
                self.top_out();
            }
        }
        self
    }

    /// Produce the successor state for one input
    pub fn update(&self, input: Input) -> GameState {
        let mut next = self.clone();
        next.events.clear();
        next.apply(input);
        next
    }

    fn apply(&mut self, input: Input) {
        match input {
            Input::Garbage { lines, holes } => {
                if self.is_running() {
                    self.receive_garbage(lines, holes);
                }
                return;
            }
            Input::Action(GameAction::Pause) => {
                if self.is_running() {
                    self.paused = !self.paused;
                }
                return;
            }
            Input::LevelUp => {
                self.level = self.level.saturating_add(1);
                return;
            }
            _ => {}
        }

        if !self.is_running() || self.paused {
            return;
        }

        match input {
            Input::Tick { dt_ms } => self.tick(dt_ms),
            Input::Action(action) => self.act(action),
            _ => {}
        }

        if self.lock.is_locked() {
            self.lock_piece();
        }
    }

    fn tick(&mut self, dt_ms: u32) {
        self.lock = self.lock.on_elapsed(dt_ms);
        if self.lock.is_locked() {
            return;
        }

        self.drop_timer_ms = self.drop_timer_ms.saturating_add(dt_ms);
        if self.drop_timer_ms >= self.drop_interval_ms() {
            self.drop_timer_ms = 0;
            self.step_down();
        }
    }

    fn act(&mut self, action: GameAction) {
        match action {
            GameAction::MoveLeft => self.shift(-1),
            GameAction::MoveRight => self.shift(1),
            GameAction::SoftDrop => {
                self.step_down();
                self.drop_timer_ms = 0;
            }
            GameAction::HardDrop => self.hard_drop(),
            GameAction::RotateCw => self.rotate(1),
            GameAction::RotateCcw => self.rotate(-1),
            GameAction::Hold => self.hold(),
            GameAction::Pause => {}
        }
    }

    fn step_down(&mut self) {
        let Some(piece) = self.active else {
            return;
        };
        let moved = piece.shifted(0, 1);
        if self.board.collides(&moved) {
            self.lock = self.lock.on_grounded();
        } else {
            self.active = Some(moved);
            self.lock = self.lock.on_descended();
        }
    }

    fn shift(&mut self, dx: i8) {
        let Some(piece) = self.active else {
            return;
        };
        let moved = piece.shifted(dx, 0);
        if !self.board.collides(&moved) {
            self.active = Some(moved);
            self.lock = self.lock.on_adjusted();
        }
    }

    fn rotate(&mut self, direction: i8) {
        let Some(piece) = self.active else {
            return;
        };
        if let Some(rotated) = pieces::try_rotate(&piece, &self.board, direction) {
            self.active = Some(rotated);
            self.lock = self.lock.on_adjusted();
        }
    }

    fn hard_drop(&mut self) {
        let Some(piece) = self.active else {
            return;
        };
        let landing = pieces::ghost_y(&piece, &self.board);
        self.active = Some(Piece { y: landing, ..piece });
        self.lock = LockState::Locked;
    }

    fn hold(&mut self) {
        if !self.can_hold {
            return;
        }
        let Some(piece) = self.active else {
            return;
        };

        match self.hold.replace(piece.kind) {
            Some(held) => {
                self.reset_piece_timers();
                self.place(Piece::spawn(held));
            }
            None => self.spawn_next(),
        }
        self.can_hold = false;
    }

    fn receive_garbage(&mut self, lines: u8, holes: u8) {
        let result = inject_garbage(
            &self.board,
            self.active.as_ref(),
            lines,
            holes,
            &mut self.garbage_rng,
        );
        self.board = result.board;
        self.active = result.piece;
        if result.topped_out {
            self.top_out();
        }
    }

    /// Merge the falling piece, clear lines, score, then spawn or finish
    fn lock_piece(&mut self) {
        let Some(piece) = self.active.take() else {
            self.lock = LockState::Falling;
            return;
        };

        let clear = self.board.merge(&piece).clear_lines();
        self.board = clear.board;
        self.push_event(CoreEvent::Locked { kind: piece.kind });

        let count = clear.cleared.len();
        if count > 0 {
            self.score = self.score.saturating_add(line_clear_score(count));
            self.lines = self.lines.saturating_add(count as u32);
            self.push_event(CoreEvent::LinesCleared {
                count: count as u32,
                rows: clear.cleared,
            });
        }

        if let GameMode::Sprint { target_lines } = self.mode {
            if self.lines >= target_lines {
                self.completed = true;
                self.lock = LockState::Falling;
                self.push_event(CoreEvent::SprintCompleted { lines: self.lines });
                return;
            }
        }

        self.can_hold = true;
        self.spawn_next();
    }

    fn spawn_next(&mut self) {
        let kind = self.generator.next();
        self.next = self.generator.preview::<PREVIEW_LEN>();
        self.reset_piece_timers();
        self.place(Piece::spawn(kind));
    }

    fn place(&mut self, piece: Piece) {
        if self.board.collides(&piece) {
            self.active = None;
            self.top_out();
        } else {
            self.active = Some(piece);
        }
    }

    fn reset_piece_timers(&mut self) {
        self.lock = LockState::Falling;
        self.drop_timer_ms = 0;
    }

    fn top_out(&mut self) {
        if self.game_over {
            return;
        }
        self.game_over = true;
        self.lock = LockState::Falling;
        self.push_event(CoreEvent::GameOver { score: self.score });
    }

    fn push_event(&mut self, event: CoreEvent) {
        // Capacity covers the worst case of a single step
        let _ = self.events.try_push(event);
    }

    /// Still accepting gameplay input
    pub fn is_running(&self) -> bool {
        !self.game_over && !self.completed
    }

    pub fn drop_interval_ms(&self) -> u32 {
        drop_interval_ms(self.level)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn active(&self) -> Option<Piece> {
        self.active
    }

    pub fn hold_piece(&self) -> Option<PieceKind> {
        self.hold
    }

    pub fn can_hold(&self) -> bool {
        self.can_hold
    }

    /// Upcoming kinds: next, then next-next
    pub fn next_pieces(&self) -> &[PieceKind] {
        &self.next
    }

    pub fn lock_state(&self) -> LockState {
        self.lock
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn game_over(&self) -> bool {
        self.game_over
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Events produced by the step that created this state
    pub fn events(&self) -> &[CoreEvent] {
        &self.events
    }

    /// Landing row of the falling piece
    pub fn ghost_y(&self) -> Option<i8> {
        self.active.map(|piece| pieces::ghost_y(&piece, &self.board))
    }
}
