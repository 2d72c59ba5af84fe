//! Client side of a battle: local engine, its async driver and room sync
//!
//! - [`LocalEngine`]: one board plus wall-clock effects (levels, hazards)
//! - [`EngineSession`]: tokio tasks driving a `LocalEngine` at a fixed step
//! - [`SyncChannel`] / [`RemoteBoards`]: best-effort snapshot exchange
//! - [`BattleClient`]: line-delimited JSON connection to the server
//!
//! ```no_run
//! use tetris_battle_engine::{EngineSession, LocalEngine, SessionConfig};
//! use tetris_battle_engine::types::GameAction;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let session = EngineSession::spawn(LocalEngine::battle(42), SessionConfig::default());
//! session.act(GameAction::HardDrop)?;
//! println!("score: {}", session.latest().score);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod hazard;
pub mod local;
pub mod session;
pub mod sync;

pub use tetris_battle_core as core;
pub use tetris_battle_types as types;

pub use client::BattleClient;
pub use hazard::{BlindHazard, GarbageHazard, HazardClock, HazardConfig, HazardEffects};
pub use local::{EngineEvent, LocalEngine};
pub use session::{EngineSession, SessionCommand, SessionConfig};
pub use sync::{clamp_sync_period, RemoteBoard, RemoteBoards, SyncChannel, DEFAULT_SYNC_PERIOD};
