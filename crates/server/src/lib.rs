//! Battle server - authoritative room coordinator over line-delimited JSON
//!
//! Clients connect over TCP and exchange the events defined in
//! `tetris-battle-protocol`. Every room lives inside one coordinator task:
//!
//! - [`registry`]: rooms and which connection speaks for which player
//! - [`battle`]: room phases, targets, win detection and the restart barrier
//! - [`targets`]: deterministic attacker -> defender assignment
//! - [`scheduler`]: room timers owned through RAII guards
//! - [`server`]: TCP accept loop, per-connection tasks and the coordinator task
//!
//! # Environment Variables
//!
//! - `TETRIS_BATTLE_HOST`: bind address (default "127.0.0.1")
//! - `TETRIS_BATTLE_PORT`: port (default 10000)
//! - `TETRIS_BATTLE_MIN_PLAYERS`: players needed to start (default 2)
//! - `TETRIS_BATTLE_RETARGET_MS`: target re-roll period (default 15000)
//! - `TETRIS_BATTLE_START_GRACE_MS`: wait for page-loaded reports (default 10000)
//! - `TETRIS_BATTLE_MAX_PENDING`: inbound queue capacity (default 1024)
//!
//! # Testing
//!
//! ```bash
//! nc 127.0.0.1 10000
//! {"type":"joinRoom","roomId":"r1","playerName":"Ada","userId":"u1"}
//! ```

pub mod battle;
pub mod config;
pub mod registry;
pub mod room;
pub mod scheduler;
pub mod server;
pub mod targets;

pub use tetris_battle_protocol as protocol;

pub use battle::{BattleCoordinator, Outgoing};
pub use config::ServerConfig;
pub use registry::{Membership, RoomRegistry};
pub use room::{ConnId, PlayerSession, Room};
pub use scheduler::{Scheduler, TimerKind, TimerTick, TokioScheduler};
pub use server::{coordinate, run_server, serve, Inbound};
pub use targets::{assign_targets, TargetMap};
