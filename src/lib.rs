//! Tetris Battle (workspace facade crate).
//!
//! Re-exports the workspace crates under one name so binaries, integration
//! tests and benches can write `tetris_battle::{core, engine, protocol, server, types}`.

pub use tetris_battle_core as core;
pub use tetris_battle_engine as engine;
pub use tetris_battle_protocol as protocol;
pub use tetris_battle_server as server;
pub use tetris_battle_types as types;
