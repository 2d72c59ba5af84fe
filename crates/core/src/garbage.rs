//! Garbage injection - penalty rows pushed up from the bottom
//!
//! Used both for attacks received from an opponent and for scripted
//! environmental hazards. Injection never fails: if the falling piece ends up
//! overlapping the stack after the shift, the caller treats that as a top-out.

use crate::board::Board;
use crate::pieces::Piece;
use crate::rng::SimpleRng;
use crate::types::{Cell, BOARD_HEIGHT, BOARD_WIDTH, EMPTY_CELL, GARBAGE_CELL};

/// Outcome of [`inject_garbage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GarbageResult {
    pub board: Board,
    pub piece: Option<Piece>,
    /// The shifted piece overlaps the stack (or the stack left the grid)
    pub topped_out: bool,
}

/// Build one garbage row with `holes` distinct empty columns
///
/// `holes` is clamped to `1..WIDTH` so a garbage row is never already full
/// and never empty.
pub fn garbage_row(holes: u8, rng: &mut SimpleRng) -> [Cell; BOARD_WIDTH as usize] {
    let holes = holes.clamp(1, BOARD_WIDTH - 1) as usize;
    let mut columns: [usize; BOARD_WIDTH as usize] = std::array::from_fn(|i| i);
    rng.shuffle(&mut columns);

    let mut row = [GARBAGE_CELL; BOARD_WIDTH as usize];
    for &x in &columns[..holes] {
        row[x] = EMPTY_CELL;
    }
    row
}

/// Remove `line_count` rows from the top, append as many garbage rows at the
/// bottom, and lift the falling piece by the same amount.
///
/// `holes_per_line` is clamped to `1..WIDTH` as in [`garbage_row`]: asking
/// for zero holes still yields one, and a full-width request leaves one
/// garbage cell. `line_count` is capped at the board height.
///
/// The piece is not clamped to the top row, so it keeps its position relative
/// to the stack. Settled cells in the discarded top rows are lost, which counts
/// as a top-out.
pub fn inject_garbage(
    board: &Board,
    piece: Option<&Piece>,
    line_count: u8,
    holes_per_line: u8,
    rng: &mut SimpleRng,
) -> GarbageResult {
    if line_count == 0 {
        return GarbageResult {
            board: *board,
            piece: piece.copied(),
            topped_out: false,
        };
    }

    let count = line_count.min(BOARD_HEIGHT);
    let overflowed = (0..count as usize).any(|y| board.row(y).iter().any(|&c| c != EMPTY_CELL));

    let rows: Vec<[Cell; BOARD_WIDTH as usize]> =
        (0..count).map(|_| garbage_row(holes_per_line, rng)).collect();
    let next = board.push_rows_from_bottom(&rows);

    let lifted = piece.map(|p| p.shifted(0, -(count as i8)));
    let collided = lifted.as_ref().is_some_and(|p| next.collides(p));

    GarbageResult {
        board: next,
        piece: lifted,
        topped_out: overflowed || collided,
    }
}
