//! Wire snapshot of a board
//!
//! This is what a client broadcasts to its room and what opponents render. It
//! carries everything needed to draw a board and nothing needed to simulate it.

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::game_state::GameState;
use crate::pieces::{shape_matrix, Piece, SHAPE_BOX};
use crate::types::{Cell, PieceKind, Rotation, BOARD_HEIGHT, BOARD_WIDTH, EMPTY_CELL, START_LEVEL};

pub type GridRows = [[Cell; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize];
pub type ShapeMatrix = [[Cell; SHAPE_BOX]; SHAPE_BOX];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i8,
    pub y: i8,
}

/// The falling piece as drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePieceSnapshot {
    pub shape: ShapeMatrix,
    pub pos: Position,
    pub color: Cell,
}

impl From<Piece> for ActivePieceSnapshot {
    fn from(piece: Piece) -> Self {
        Self {
            shape: piece.shape_matrix(),
            pos: Position {
                x: piece.x,
                y: piece.y,
            },
            color: piece.color(),
        }
    }
}

/// A piece shown in the hold or preview slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewPieceSnapshot {
    pub shape: ShapeMatrix,
    pub color: Cell,
}

impl From<PieceKind> for PreviewPieceSnapshot {
    fn from(kind: PieceKind) -> Self {
        Self {
            shape: shape_matrix(kind, Rotation::North),
            color: kind.color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub grid: GridRows,
    pub current_piece: Option<ActivePieceSnapshot>,
    pub score: u32,
    pub level: u32,
    pub hold_piece: Option<PreviewPieceSnapshot>,
    pub next_piece: Option<PreviewPieceSnapshot>,
    pub next_next_piece: Option<PreviewPieceSnapshot>,
    pub is_game_over: bool,
    #[serde(default)]
    pub lines: u32,
    /// Blind hazard active; renderers hide settled cells
    #[serde(default)]
    pub hidden: bool,
}

impl BoardSnapshot {
    pub fn from_state(state: &GameState) -> Self {
        let next = state.next_pieces();
        Self {
            grid: state.board().to_rows(),
            current_piece: state.active().map(ActivePieceSnapshot::from),
            score: state.score(),
            level: state.level(),
            hold_piece: state.hold_piece().map(PreviewPieceSnapshot::from),
            next_piece: next.first().copied().map(PreviewPieceSnapshot::from),
            next_next_piece: next.get(1).copied().map(PreviewPieceSnapshot::from),
            is_game_over: state.game_over(),
            lines: state.lines(),
            hidden: false,
        }
    }

    /// Settled cells as a board value
    pub fn board(&self) -> Board {
        Board::from_rows(&self.grid)
    }

    /// Count of settled, non-empty cells
    pub fn filled_cells(&self) -> usize {
        self.grid
            .iter()
            .flatten()
            .filter(|&&cell| cell != EMPTY_CELL)
            .count()
    }
}

impl Default for BoardSnapshot {
    fn default() -> Self {
        Self {
            grid: [[EMPTY_CELL; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize],
            current_piece: None,
            score: 0,
            level: START_LEVEL,
            hold_piece: None,
            next_piece: None,
            next_next_piece: None,
            is_game_over: false,
            lines: 0,
            hidden: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_state::GameMode;

    #[test]
    fn snapshot_uses_camel_case_fields() {
        let state = GameState::new(42, GameMode::Battle);
        let value = serde_json::to_value(BoardSnapshot::from_state(&state)).expect("serialize");

        for field in [
            "grid",
            "currentPiece",
            "score",
            "level",
            "holdPiece",
            "nextPiece",
            "nextNextPiece",
            "isGameOver",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert_eq!(value["grid"].as_array().map(|rows| rows.len()), Some(20));
        assert_eq!(value["grid"][0].as_array().map(|row| row.len()), Some(10));
        assert_eq!(value["currentPiece"]["pos"]["x"], 3);
        assert!(value["holdPiece"].is_null());
    }

    #[test]
    fn snapshot_accepts_minimal_payload() {
        let grid = [[0u8; 10]; 20];
        let json = serde_json::json!({
            "grid": grid,
            "currentPiece": null,
            "score": 300,
            "level": 2,
            "holdPiece": null,
            "nextPiece": null,
            "nextNextPiece": null,
            "isGameOver": true
        });
        let snapshot: BoardSnapshot = serde_json::from_value(json).expect("deserialize");
        assert_eq!(snapshot.score, 300);
        assert!(snapshot.is_game_over);
        assert!(!snapshot.hidden);
        assert_eq!(snapshot.filled_cells(), 0);
    }

    #[test]
    fn preview_slots_follow_generator() {
        let state = GameState::new(8, GameMode::Battle);
        let snapshot = BoardSnapshot::from_state(&state);
        let expected = state.next_pieces()[1].color();
        assert_eq!(snapshot.next_next_piece.map(|p| p.color), Some(expected));
    }
}
