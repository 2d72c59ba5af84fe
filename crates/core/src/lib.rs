//! Core game logic - pure, deterministic, and testable
//!
//! This crate contains the board rules and the per-player game state shared by
//! every game mode. It has **no dependencies** on networking, timers or I/O:
//!
//! - **Deterministic**: the same seed and input sequence produce the same game
//! - **Value-based**: [`GameState::update`] returns a new state, never mutates
//! - **Portable**: used by the local engine, bots, tests and benches alike
//!
//! # Module Structure
//!
//! - [`board`]: 10x20 grid with collision, merge and line clearing
//! - [`pieces`]: tetromino shapes and SRS rotation with wall kicks
//! - [`rng`]: LCG and 7-bag piece generator
//! - [`lock`]: lock delay state machine
//! - [`garbage`]: penalty row injection
//! - [`scoring`]: points, attack table and gravity per level
//! - [`game_state`]: one board's complete state and its update function
//! - [`snapshot`]: serde wire form of a board
//! - [`timer`]: RAII timer guard
//!
//! # Example
//!
//! ```
//! use tetris_battle_core::{GameMode, GameState, Input};
//! use tetris_battle_types::GameAction;
//!
//! let game = GameState::new(12345, GameMode::Battle);
//! let game = game.update(Input::Action(GameAction::MoveRight));
//! let game = game.update(Input::Action(GameAction::HardDrop));
//!
//! assert!(!game.game_over());
//! assert!(game.active().is_some());
//! ```

pub mod board;
pub mod game_state;
pub mod garbage;
pub mod lock;
pub mod pieces;
pub mod rng;
pub mod scoring;
pub mod snapshot;
pub mod timer;

pub use tetris_battle_types as types;

pub use board::{Board, ClearedRows, LineClear};
pub use game_state::{CoreEvent, GameMode, GameState, Input};
pub use garbage::{inject_garbage, GarbageResult};
pub use lock::LockState;
pub use pieces::{ghost_y, rotate, try_rotate, Piece};
pub use rng::{generate_bag, PieceGenerator, SimpleRng};
pub use scoring::{attack_lines, drop_interval_ms, line_clear_score};
pub use snapshot::BoardSnapshot;
pub use timer::TimerGuard;
