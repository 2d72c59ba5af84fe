//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the workspace.
//! All types are pure data structures with no external dependencies, making them
//! usable in any context (core logic, local engine, room server, wire protocol).
//!
//! # Board Dimensions
//!
//! - **Width**: 10 columns (indexed 0-9)
//! - **Height**: 20 rows (indexed 0-19, y grows downward)
//! - **Spawn position**: (3, 0) for every piece
//!
//! # Cell Values
//!
//! | Value | Meaning |
//! |-------|---------|
//! | `0` | empty |
//! | `1..=7` | settled piece, `PieceKind::index() + 1` |
//! | `8` | garbage line cell |
//!
//! # Game Timing Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Fixed timestep interval (~60 FPS) |
//! | `INITIAL_DROP_INTERVAL_MS` | 500 | Gravity at level 1 |
//! | `LOCK_DELAY_MS` | 500 | Time before a grounded piece locks |
//! | `MAX_LOCK_MOVES` | 15 | Adjustments allowed while locking |
//! | `LEVEL_UP_INTERVAL_MS` | 5000 | Battle mode level cadence |
//!
//! # Examples
//!
//! ```
//! use tetris_battle_types::{PieceKind, Rotation, GameAction, BOARD_WIDTH, BOARD_HEIGHT};
//!
//! let piece = PieceKind::T;
//! assert_eq!(piece.color(), 2);
//!
//! assert_eq!(Rotation::North.rotate(1), Rotation::East);
//! assert_eq!(GameAction::HardDrop.as_str(), "hardDrop");
//!
//! assert_eq!(BOARD_WIDTH, 10);
//! assert_eq!(BOARD_HEIGHT, 20);
//! ```

/// Board width in cells (10 columns)
pub const BOARD_WIDTH: u8 = 10;

/// Board height in cells (20 rows)
pub const BOARD_HEIGHT: u8 = 20;

/// Empty cell value
pub const EMPTY_CELL: Cell = 0;

/// Garbage cell value (one past the last piece color)
pub const GARBAGE_CELL: Cell = 8;

/// Fixed timestep interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Gravity interval at level 1
pub const INITIAL_DROP_INTERVAL_MS: u32 = 500;

/// Gravity reduction per level
pub const DROP_INTERVAL_STEP_MS: u32 = 50;

/// Fastest gravity interval
pub const DROP_INTERVAL_FLOOR_MS: u32 = 150;

/// Lock delay when a piece can no longer descend
pub const LOCK_DELAY_MS: u32 = 500;

/// Successful adjustments allowed while locking before the piece is forced down
pub const MAX_LOCK_MOVES: u8 = 15;

/// Battle mode raises the level on this wall-clock cadence
pub const LEVEL_UP_INTERVAL_MS: u32 = 5000;

/// Level at round start
pub const START_LEVEL: u32 = 1;

/// Lines required to finish the single-player sprint variant
pub const SPRINT_TARGET_LINES: u32 = 25;

/// Points per lock are `lines * lines * LINE_CLEAR_BASE`
pub const LINE_CLEAR_BASE: u32 = 100;

/// Garbage lines sent to the target, indexed by lines cleared in one lock
pub const ATTACK_TABLE: [u32; 5] = [0, 0, 1, 2, 4];

/// Holes per attack garbage line
pub const ATTACK_HOLES_PER_LINE: u8 = 1;

/// Upcoming pieces exposed in snapshots (next, next-next)
pub const PREVIEW_LEN: usize = 2;

/// A single board cell value (see module docs for the encoding)
pub type Cell = u8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_defaults() {
        assert_eq!(LOCK_DELAY_MS, 500);
        assert_eq!(MAX_LOCK_MOVES, 15);
        assert_eq!(INITIAL_DROP_INTERVAL_MS, 500);
        assert_eq!(DROP_INTERVAL_FLOOR_MS, 150);
        assert_eq!(SPRINT_TARGET_LINES, 25);
    }

    #[test]
    fn garbage_sentinel_follows_piece_colors() {
        let max_color = PieceKind::ALL.iter().map(|k| k.color()).max();
        assert_eq!(max_color, Some(7));
        assert_eq!(GARBAGE_CELL, 8);
    }
}

/// The seven tetromino piece kinds, in color-index order
///
/// - **I**: horizontal bar
/// - **T**: T-shaped
/// - **L**: L-shaped
/// - **J**: J-shaped (mirror of L)
/// - **O**: 2x2 square
/// - **S**: S-shaped
/// - **Z**: Z-shaped (mirror of S)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceKind {
    I,
    T,
    L,
    J,
    O,
    S,
    Z,
}

impl PieceKind {
    /// Every kind in type-index order (one full bag)
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::T,
        PieceKind::L,
        PieceKind::J,
        PieceKind::O,
        PieceKind::S,
        PieceKind::Z,
    ];

    /// Type index 0..=6
    pub fn index(&self) -> u8 {
        match self {
            PieceKind::I => 0,
            PieceKind::T => 1,
            PieceKind::L => 2,
            PieceKind::J => 3,
            PieceKind::O => 4,
            PieceKind::S => 5,
            PieceKind::Z => 6,
        }
    }

    /// Cell value written to the board when this kind locks
    pub fn color(&self) -> Cell {
        self.index() + 1
    }
}

/// Rotation states following the Super Rotation System (SRS)
///
/// - **North**: Spawn orientation (0)
/// - **East**: Rotated 90° clockwise (1)
/// - **South**: Rotated 180° (2)
/// - **West**: Rotated 90° counter-clockwise (3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    North,
    East,
    South,
    West,
}

impl Rotation {
    /// Orientation index 0..=3
    pub fn index(&self) -> u8 {
        match self {
            Rotation::North => 0,
            Rotation::East => 1,
            Rotation::South => 2,
            Rotation::West => 3,
        }
    }

    pub fn from_index(index: u8) -> Self {
        match index % 4 {
            0 => Rotation::North,
            1 => Rotation::East,
            2 => Rotation::South,
            _ => Rotation::West,
        }
    }

    /// `(orientation + direction) mod 4`; `+1` is clockwise, `-1` counter-clockwise
    ///
    /// # Examples
    ///
    /// ```
    /// use tetris_battle_types::Rotation;
    ///
    /// assert_eq!(Rotation::North.rotate(1), Rotation::East);
    /// assert_eq!(Rotation::North.rotate(-1), Rotation::West);
    /// assert_eq!(Rotation::West.rotate(1), Rotation::North);
    /// ```
    pub fn rotate(&self, direction: i8) -> Self {
        let next = (self.index() as i16 + direction as i16).rem_euclid(4);
        Self::from_index(next as u8)
    }
}

/// Player inputs applied synchronously inside a simulation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameAction {
    /// Move piece one cell left
    MoveLeft,
    /// Move piece one cell right
    MoveRight,
    /// Drop piece one cell down
    SoftDrop,
    /// Drop to the lowest valid position and lock immediately
    HardDrop,
    /// Rotate piece 90° clockwise
    RotateCw,
    /// Rotate piece 90° counter-clockwise
    RotateCcw,
    /// Swap with the hold slot (once per piece)
    Hold,
    /// Toggle pause state
    Pause,
}

impl GameAction {
    /// Convert to camelCase string
    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::MoveLeft => "moveLeft",
            GameAction::MoveRight => "moveRight",
            GameAction::SoftDrop => "softDrop",
            GameAction::HardDrop => "hardDrop",
            GameAction::RotateCw => "rotateCw",
            GameAction::RotateCcw => "rotateCcw",
            GameAction::Hold => "hold",
            GameAction::Pause => "pause",
        }
    }
}
