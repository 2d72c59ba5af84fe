//! Pieces tests - shapes, SRS rotation and the 7-bag generator

use std::collections::HashMap;

use tetris_battle::core::pieces::{get_kick_table, get_shape, SPAWN_POSITION};
use tetris_battle::core::{ghost_y, rotate, try_rotate, Board, Piece, PieceGenerator};
use tetris_battle::types::{PieceKind, Rotation, BOARD_HEIGHT, GARBAGE_CELL};

const ROTATIONS: [Rotation; 4] = [
    Rotation::North,
    Rotation::East,
    Rotation::South,
    Rotation::West,
];

fn at(kind: PieceKind, rotation: Rotation, x: i8, y: i8) -> Piece {
    Piece {
        kind,
        rotation,
        x,
        y,
    }
}

// ============== Shape Tests ==============

#[test]
fn test_i_piece_shapes() {
    assert_eq!(get_shape(PieceKind::I, Rotation::North), [(0, 1), (1, 1), (2, 1), (3, 1)]);
    assert_eq!(get_shape(PieceKind::I, Rotation::East), [(2, 0), (2, 1), (2, 2), (2, 3)]);
    assert_eq!(get_shape(PieceKind::I, Rotation::South), [(0, 2), (1, 2), (2, 2), (3, 2)]);
    assert_eq!(get_shape(PieceKind::I, Rotation::West), [(1, 0), (1, 1), (1, 2), (1, 3)]);
}

#[test]
fn test_o_piece_same_in_every_orientation() {
    let north = get_shape(PieceKind::O, Rotation::North);
    for rotation in ROTATIONS {
        assert_eq!(get_shape(PieceKind::O, rotation), north);
    }
}

#[test]
fn test_all_shapes_fit_the_box_with_distinct_minos() {
    for kind in PieceKind::ALL {
        for rotation in ROTATIONS {
            let shape = get_shape(kind, rotation);
            for (i, &(x, y)) in shape.iter().enumerate() {
                assert!((0..4).contains(&x) && (0..4).contains(&y), "{kind:?} {rotation:?}");
                assert!(!shape[i + 1..].contains(&(x, y)), "{kind:?} {rotation:?} repeats a mino");
            }
        }
    }
}

#[test]
fn test_spawn_position() {
    let piece = Piece::spawn(PieceKind::T);
    assert_eq!((piece.x, piece.y), SPAWN_POSITION);
    assert_eq!(piece.rotation, Rotation::North);
}

// ============== SRS Rotation Tests ==============

#[test]
fn test_four_rotations_return_to_start() {
    let board = Board::new();
    for kind in PieceKind::ALL {
        let start = at(kind, Rotation::North, 3, 8);
        for direction in [1, -1] {
            let mut piece = start;
            for _ in 0..4 {
                piece = try_rotate(&piece, &board, direction).expect("open board");
            }
            assert_eq!(piece, start, "{kind:?} direction {direction}");
        }
    }
}

#[test]
fn test_cw_then_ccw_is_identity_when_unobstructed() {
    let board = Board::new();
    let start = at(PieceKind::L, Rotation::South, 4, 10);
    let there = rotate(&start, &board, 1);
    assert_eq!(there.rotation, Rotation::West);
    assert_eq!(rotate(&there, &board, -1), start);
}

#[test]
fn test_t_rotation_uses_kick_when_blocked() {
    let mut board = Board::new();
    // East T at (3, 5) needs (4, 6)
    board.set(4, 6, GARBAGE_CELL);

    let start = at(PieceKind::T, Rotation::North, 3, 5);
    let rotated = try_rotate(&start, &board, 1).expect("a kick fits");
    assert_eq!(rotated.rotation, Rotation::East);
    assert_ne!((rotated.x, rotated.y), (start.x, start.y));
    assert!(!board.collides(&rotated));
}

#[test]
fn test_rotation_fails_when_every_kick_is_blocked() {
    let mut board = Board::new();
    for y in 0..BOARD_HEIGHT as i8 {
        for x in 0..10 {
            board.set(x, y, GARBAGE_CELL);
        }
    }
    let start = at(PieceKind::T, Rotation::North, 3, 5);
    assert_eq!(try_rotate(&start, &board, 1), None);
    assert_eq!(rotate(&start, &board, 1), start);
}

#[test]
fn test_i_wall_kick_off_right_wall() {
    let board = Board::new();
    // Vertical I hugging the right wall: column 2 of its box is x = 9
    let start = at(PieceKind::I, Rotation::East, 7, 5);
    assert!(!board.collides(&start));
    let rotated = try_rotate(&start, &board, -1).expect("kicks off the wall");
    assert_eq!(rotated.rotation, Rotation::North);
    assert!(rotated.cells().iter().all(|&(x, _)| (0..10).contains(&x)));
}

#[test]
fn test_o_kick_table_is_all_zero() {
    for kicks in get_kick_table(PieceKind::O) {
        assert!(kicks.iter().all(|&k| k == (0, 0)));
    }
    for kind in PieceKind::ALL {
        for kicks in get_kick_table(kind) {
            assert_eq!(kicks[0], (0, 0), "{kind:?} first candidate is the plain rotation");
        }
    }
}

#[test]
fn test_ghost_lands_on_floor_and_stack() {
    let mut board = Board::new();
    let o = Piece::spawn(PieceKind::O);
    assert_eq!(ghost_y(&o, &board), BOARD_HEIGHT as i8 - 2);

    board.set(4, 10, GARBAGE_CELL);
    // O occupies box columns 1..=2, so x = 3 puts it over column 4
    assert_eq!(ghost_y(&o, &board), 8);
}

// ============== 7-bag ==============

#[test]
fn test_bag_aligned_draws_are_balanced() {
    for seed in [0, 1, 42, 12345, u32::MAX] {
        let mut generator = PieceGenerator::new(seed);
        let bags = 20;
        let mut counts: HashMap<PieceKind, usize> = HashMap::new();
        for _ in 0..bags * 7 {
            *counts.entry(generator.next()).or_default() += 1;
        }
        for kind in PieceKind::ALL {
            assert_eq!(counts.get(&kind), Some(&bags), "seed {seed} kind {kind:?}");
        }
    }
}

#[test]
fn test_preview_does_not_consume_or_shift_bags() {
    let mut peeked = PieceGenerator::new(777);
    let mut plain = PieceGenerator::new(777);

    let preview = peeked.preview::<10>();
    let drawn: Vec<PieceKind> = (0..10).map(|_| plain.next()).collect();
    assert_eq!(preview.as_slice(), drawn.as_slice());
    for &kind in &drawn {
        assert_eq!(peeked.next(), kind);
    }
}

#[test]
fn test_same_seed_same_sequence() {
    let mut a = PieceGenerator::new(2024);
    let mut b = PieceGenerator::new(2024);
    for _ in 0..100 {
        assert_eq!(a.next(), b.next());
    }
}
