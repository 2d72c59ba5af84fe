//! Lock delay state machine
//!
//! A piece that can no longer descend gets a grace period before it becomes
//! part of the board. The grace period ends when either the accumulated time
//! reaches [`LOCK_DELAY_MS`] or the player has used up [`MAX_LOCK_MOVES`]
//! successful adjustments, whichever comes first.

use crate::types::{LOCK_DELAY_MS, MAX_LOCK_MOVES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    /// Piece can still move down
    #[default]
    Falling,
    /// Piece is resting on something; waiting to lock
    Locking { elapsed_ms: u32, moves: u8 },
    /// Grace period is over; the owner must merge the piece
    Locked,
}

impl LockState {
    /// A downward shift would collide
    pub fn on_grounded(self) -> Self {
        match self {
            LockState::Falling => LockState::Locking {
                elapsed_ms: 0,
                moves: 0,
            },
            other => other,
        }
    }

    /// The piece moved down successfully
    pub fn on_descended(self) -> Self {
        match self {
            LockState::Locked => LockState::Locked,
            _ => LockState::Falling,
        }
    }

    /// A lateral move or rotation succeeded
    pub fn on_adjusted(self) -> Self {
        match self {
            LockState::Locking { elapsed_ms, moves } => {
                Self::settle(elapsed_ms, moves.saturating_add(1))
            }
            other => other,
        }
    }

    /// Simulation time passed
    pub fn on_elapsed(self, dt_ms: u32) -> Self {
        match self {
            LockState::Locking { elapsed_ms, moves } => {
                Self::settle(elapsed_ms.saturating_add(dt_ms), moves)
            }
            other => other,
        }
    }

    fn settle(elapsed_ms: u32, moves: u8) -> Self {
        if elapsed_ms >= LOCK_DELAY_MS || moves >= MAX_LOCK_MOVES {
            LockState::Locked
        } else {
            LockState::Locking { elapsed_ms, moves }
        }
    }

    pub fn is_locking(&self) -> bool {
        matches!(self, LockState::Locking { .. })
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked)
    }
}
