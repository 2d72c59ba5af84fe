//! Board module - the fixed 10x20 cell grid
//!
//! The board is a flat array of cell values for cache locality and cheap copies.
//! Coordinates: (x, y) where x ranges 0..9 (left to right), y ranges 0..19 (top to bottom).
//! Rows above the visible grid (y < 0) exist only for pieces: they never collide and
//! are dropped on merge.
//!
//! All grid-producing operations (`merge`, `clear_lines`) return a new board; the
//! input is never mutated.

use arrayvec::ArrayVec;

use crate::pieces::Piece;
use crate::types::{Cell, BOARD_HEIGHT, BOARD_WIDTH, EMPTY_CELL};

/// Total number of cells on the board
const BOARD_SIZE: usize = (BOARD_WIDTH as usize) * (BOARD_HEIGHT as usize);

/// Row indices removed by a line clear, bottom to top
pub type ClearedRows = ArrayVec<usize, { BOARD_HEIGHT as usize }>;

/// The game board - 10 columns x 20 rows using flat array storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    /// Flat array of cells, row-major order (y * WIDTH + x)
    cells: [Cell; BOARD_SIZE],
}

/// Result of [`Board::clear_lines`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineClear {
    pub board: Board,
    pub cleared: ClearedRows,
}

impl LineClear {
    pub fn count(&self) -> usize {
        self.cleared.len()
    }
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            cells: [EMPTY_CELL; BOARD_SIZE],
        }
    }

    /// Build a board from row-major rows (wire format)
    pub fn from_rows(rows: &[[Cell; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize]) -> Self {
        let mut board = Self::new();
        for (y, row) in rows.iter().enumerate() {
            let start = y * BOARD_WIDTH as usize;
            board.cells[start..start + BOARD_WIDTH as usize].copy_from_slice(row);
        }
        board
    }

    /// Copy out as row-major rows (wire format)
    pub fn to_rows(&self) -> [[Cell; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize] {
        let mut rows = [[EMPTY_CELL; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize];
        for (y, row) in rows.iter_mut().enumerate() {
            row.copy_from_slice(self.row(y));
        }
        rows
    }

    /// Calculate flat index from (x, y) coordinates
    #[inline(always)]
    fn index(x: i8, y: i8) -> Option<usize> {
        if x < 0 || x >= BOARD_WIDTH as i8 || y < 0 || y >= BOARD_HEIGHT as i8 {
            return None;
        }
        Some((y as usize) * (BOARD_WIDTH as usize) + (x as usize))
    }

    pub fn width(&self) -> u8 {
        BOARD_WIDTH
    }

    pub fn height(&self) -> u8 {
        BOARD_HEIGHT
    }

    /// Get cell at position (x, y); None if out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<Cell> {
        Self::index(x, y).map(|idx| self.cells[idx])
    }

    /// Set cell at position (x, y); false if out of bounds
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Whether a single piece cell may occupy (x, y)
    ///
    /// Columns outside `[0, WIDTH)` and rows at or below the floor are blocked.
    /// Rows above the grid are always free.
    #[inline]
    pub fn is_free(&self, x: i8, y: i8) -> bool {
        if x < 0 || x >= BOARD_WIDTH as i8 || y >= BOARD_HEIGHT as i8 {
            return false;
        }
        if y < 0 {
            return true;
        }
        matches!(self.get(x, y), Some(EMPTY_CELL))
    }

    /// Check if position is occupied (within bounds and filled)
    pub fn is_occupied(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(c) if c != EMPTY_CELL)
    }

    /// Whether any occupied cell of `piece` leaves the grid or overlaps a settled cell
    pub fn collides(&self, piece: &Piece) -> bool {
        piece
            .cells()
            .iter()
            .any(|&(x, y)| !self.is_free(x, y))
    }

    /// Borrow one row
    pub fn row(&self, y: usize) -> &[Cell] {
        let start = y * BOARD_WIDTH as usize;
        &self.cells[start..start + BOARD_WIDTH as usize]
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        if y >= BOARD_HEIGHT as usize {
            return false;
        }
        self.row(y).iter().all(|&cell| cell != EMPTY_CELL)
    }

    /// Write the piece's occupied cells into a copy of the board
    ///
    /// Cells above the grid are discarded.
    pub fn merge(&self, piece: &Piece) -> Board {
        let mut next = *self;
        let color = piece.color();
        for (x, y) in piece.cells() {
            if y >= 0 {
                next.set(x, y, color);
            }
        }
        next
    }

    /// Remove every full row, prepend as many empty rows at the top
    ///
    /// Uses a two-pointer compaction scanning bottom to top. A board with no
    /// full row comes back unchanged with an empty index list.
    pub fn clear_lines(&self) -> LineClear {
        let mut next = *self;
        let mut cleared = ClearedRows::new();
        let width = BOARD_WIDTH as usize;
        let mut write_y = BOARD_HEIGHT as usize;

        for read_y in (0..BOARD_HEIGHT as usize).rev() {
            if self.is_row_full(read_y) {
                cleared.push(read_y);
            } else {
                write_y -= 1;
                if write_y != read_y {
                    let src_start = read_y * width;
                    let dst_start = write_y * width;
                    next.cells
                        .copy_within(src_start..src_start + width, dst_start);
                }
            }
        }

        for cell in &mut next.cells[..write_y * width] {
            *cell = EMPTY_CELL;
        }

        LineClear {
            board: next,
            cleared,
        }
    }

    /// Drop `count` rows from the top and append `rows` at the bottom
    ///
    /// `rows.len()` must equal `count`; extra rows are ignored.
    pub(crate) fn push_rows_from_bottom(&self, rows: &[[Cell; BOARD_WIDTH as usize]]) -> Board {
        let width = BOARD_WIDTH as usize;
        let count = rows.len().min(BOARD_HEIGHT as usize);
        let mut next = *self;
        next.cells.copy_within(count * width.., 0);
        let base = BOARD_HEIGHT as usize - count;
        for (i, row) in rows.iter().take(count).enumerate() {
            let start = (base + i) * width;
            next.cells[start..start + width].copy_from_slice(row);
        }
        next
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Highest occupied row, if any
    pub fn stack_top(&self) -> Option<usize> {
        (0..BOARD_HEIGHT as usize).find(|&y| self.row(y).iter().any(|&c| c != EMPTY_CELL))
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PieceKind, Rotation, GARBAGE_CELL};

    fn filled_row_except(hole: usize) -> [Cell; BOARD_WIDTH as usize] {
        let mut row = [GARBAGE_CELL; BOARD_WIDTH as usize];
        row[hole] = EMPTY_CELL;
        row
    }

    #[test]
    fn test_board_index_calculation() {
        assert_eq!(Board::index(0, 0), Some(0));
        assert_eq!(Board::index(9, 0), Some(9));
        assert_eq!(Board::index(0, 1), Some(10));
        assert_eq!(Board::index(9, 19), Some(199));
        assert_eq!(Board::index(-1, 0), None);
        assert_eq!(Board::index(10, 0), None);
        assert_eq!(Board::index(0, 20), None);
    }

    #[test]
    fn test_cells_above_grid_are_free() {
        let board = Board::new();
        assert!(board.is_free(0, -3));
        assert!(!board.is_free(-1, -3));
        assert!(!board.is_free(10, -1));
        assert!(!board.is_free(4, 20));
    }

    #[test]
    fn test_merge_does_not_touch_source() {
        let board = Board::new();
        let piece = Piece {
            kind: PieceKind::O,
            rotation: Rotation::North,
            x: 3,
            y: 18,
        };
        let merged = board.merge(&piece);
        assert_eq!(board, Board::new());
        assert_eq!(merged.get(4, 18), Some(PieceKind::O.color()));
        assert_eq!(merged.get(5, 19), Some(PieceKind::O.color()));
    }

    #[test]
    fn test_merge_drops_cells_above_grid() {
        let piece = Piece {
            kind: PieceKind::I,
            rotation: Rotation::East,
            x: 0,
            y: -2,
        };
        let merged = Board::new().merge(&piece);
        // East I occupies column 2 rows -2..=1; only rows 0 and 1 survive.
        assert_eq!(merged.cells().iter().filter(|&&c| c != EMPTY_CELL).count(), 2);
        assert!(merged.is_occupied(2, 0));
        assert!(merged.is_occupied(2, 1));
    }

    #[test]
    fn test_clear_lines_identity_without_full_rows() {
        let mut board = Board::new();
        board.set(0, 19, 3);
        board.set(5, 10, GARBAGE_CELL);
        let result = board.clear_lines();
        assert_eq!(result.board, board);
        assert_eq!(result.count(), 0);
        assert!(result.cleared.is_empty());
    }

    #[test]
    fn test_clear_lines_removes_single_full_row() {
        let mut rows = [[EMPTY_CELL; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize];
        rows[19] = filled_row_except(3);
        rows[18] = [1; BOARD_WIDTH as usize];
        rows[17][7] = 5;
        let board = Board::from_rows(&rows);

        let result = board.clear_lines();
        assert_eq!(result.count(), 1);
        assert_eq!(result.cleared.as_slice(), &[18]);

        let out = result.board.to_rows();
        assert_eq!(out[19], filled_row_except(3));
        assert_eq!(out[18][7], 5);
        assert_eq!(out[0], [EMPTY_CELL; BOARD_WIDTH as usize]);
    }

    #[test]
    fn test_clear_lines_reports_bottom_to_top() {
        let mut rows = [[EMPTY_CELL; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize];
        rows[19] = [2; BOARD_WIDTH as usize];
        rows[18] = filled_row_except(0);
        rows[17] = [4; BOARD_WIDTH as usize];
        let result = Board::from_rows(&rows).clear_lines();
        assert_eq!(result.cleared.as_slice(), &[19, 17]);
        let out = result.board.to_rows();
        assert_eq!(out[19], filled_row_except(0));
        assert!(out[..19].iter().all(|r| r.iter().all(|&c| c == EMPTY_CELL)));
    }

    #[test]
    fn test_push_rows_from_bottom_shifts_stack_up() {
        let mut board = Board::new();
        board.set(0, 0, 1);
        board.set(2, 19, 6);
        let shifted = board.push_rows_from_bottom(&[filled_row_except(4)]);
        // Top row was discarded.
        assert_eq!(shifted.get(0, 0), Some(EMPTY_CELL));
        assert_eq!(shifted.get(2, 18), Some(6));
        assert_eq!(shifted.row(19), &filled_row_except(4));
    }

    #[test]
    fn test_rows_roundtrip() {
        let mut rows = [[EMPTY_CELL; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize];
        rows[5][3] = 5;
        rows[10][7] = GARBAGE_CELL;
        assert_eq!(Board::from_rows(&rows).to_rows(), rows);
    }
}
