use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tetris_battle::core::{inject_garbage, Board, GameMode, GameState, Input, Piece, SimpleRng};
use tetris_battle::types::{GameAction, PieceKind, GARBAGE_CELL, TICK_MS};

fn bench_tick(c: &mut Criterion) {
    let state = GameState::new(12345, GameMode::Battle);

    c.bench_function("game_tick_16ms", |b| {
        b.iter(|| state.update(black_box(Input::Tick { dt_ms: TICK_MS })))
    });
}

fn bench_line_clear(c: &mut Criterion) {
    let mut board = Board::new();
    for y in 16..20 {
        for x in 0..10 {
            board.set(x, y, GARBAGE_CELL);
        }
    }

    c.bench_function("clear_4_lines", |b| b.iter(|| black_box(&board).clear_lines()));
}

fn bench_collides(c: &mut Criterion) {
    let board = Board::new();
    let piece = Piece::spawn(PieceKind::T);

    c.bench_function("collides", |b| {
        b.iter(|| black_box(&board).collides(black_box(&piece)))
    });
}

fn bench_hard_drop(c: &mut Criterion) {
    let state = GameState::new(12345, GameMode::Battle);

    c.bench_function("hard_drop", |b| {
        b.iter(|| state.update(black_box(Input::Action(GameAction::HardDrop))))
    });
}

fn bench_rotate(c: &mut Criterion) {
    let state = GameState::new(12345, GameMode::Battle);

    c.bench_function("rotate_cw", |b| {
        b.iter(|| state.update(black_box(Input::Action(GameAction::RotateCw))))
    });
}

fn bench_garbage(c: &mut Criterion) {
    let board = Board::new();
    let piece = Piece::spawn(PieceKind::I);

    c.bench_function("inject_4_garbage", |b| {
        let mut rng = SimpleRng::new(7);
        b.iter(|| inject_garbage(black_box(&board), Some(&piece), 4, 1, &mut rng))
    });
}

criterion_group!(
    benches,
    bench_tick,
    bench_line_clear,
    bench_collides,
    bench_hard_drop,
    bench_rotate,
    bench_garbage
);
criterion_main!(benches);
