//! Headless battle client.
//!
//! Joins a room, plays with a random-placement bot and reports line clears and
//! top-outs like a real client would. Useful for load testing a server and for
//! filling a room while developing a frontend.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

use tetris_battle::engine::client::DEFAULT_OUTBOUND_CAPACITY;
use tetris_battle::engine::{
    BattleClient, EngineEvent, EngineSession, HazardConfig, LocalEngine, RemoteBoards,
    SessionCommand, SessionConfig, SyncChannel,
};
use tetris_battle::protocol::{ClientEvent, RoomPhase, ServerEvent};
use tetris_battle::core::GameMode;
use tetris_battle::types::{GameAction, TICK_MS};

#[derive(Parser)]
#[command(name = "headless-client", about = "Random-placement bot for Tetris battle rooms")]
struct Cli {
    /// Server address
    #[arg(long, default_value = "127.0.0.1:10000", env = "TETRIS_BATTLE_ADDR")]
    addr: String,

    /// Room to join (created if missing)
    #[arg(long, default_value = "lobby")]
    room: String,

    /// Stable user id; random when omitted
    #[arg(long)]
    user_id: Option<String>,

    /// Display name; defaults to the user id
    #[arg(long)]
    name: Option<String>,

    /// Start the round once enough players joined (creator only)
    #[arg(long)]
    start: bool,

    /// Players to wait for before starting
    #[arg(long, default_value_t = 2)]
    min_players: usize,

    /// Milliseconds between bot placements
    #[arg(long, default_value_t = 400)]
    move_ms: u64,

    /// Snapshot broadcast period in milliseconds (clamped to 10..=100)
    #[arg(long, default_value_t = 50)]
    sync_ms: u64,

    /// Inject one two-hole garbage row every four seconds
    #[arg(long)]
    scorching: bool,

    /// Rounds to play before leaving
    #[arg(long, default_value_t = 1)]
    rounds: u32,
}

/// Engine task plus the broadcast of its snapshots
struct Round {
    session: EngineSession,
    _sync: SyncChannel,
}

/// Rotate, shift, then hard drop at random
fn random_placement(rng: &mut StdRng) -> Vec<GameAction> {
    let mut actions = Vec::new();
    for _ in 0..rng.gen_range(0..4) {
        actions.push(GameAction::RotateCw);
    }
    let dx: i32 = rng.gen_range(-5..=5);
    let shift = if dx < 0 {
        GameAction::MoveLeft
    } else {
        GameAction::MoveRight
    };
    actions.extend(std::iter::repeat(shift).take(dx.unsigned_abs() as usize));
    actions.push(GameAction::HardDrop);
    actions
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let mut rng = StdRng::from_entropy();
    let user_id = cli
        .user_id
        .clone()
        .unwrap_or_else(|| format!("bot-{:08x}", rng.gen::<u32>()));
    let name = cli.name.clone().unwrap_or_else(|| user_id.clone());
    let hazards = if cli.scorching {
        HazardConfig::scorching()
    } else {
        HazardConfig::none()
    };

    let mut client = BattleClient::connect(&cli.addr, DEFAULT_OUTBOUND_CAPACITY).await?;
    client
        .send(&ClientEvent::JoinRoom {
            room_id: cli.room.clone(),
            player_name: name.clone(),
            user_id: user_id.clone(),
        })
        .await?;
    tracing::info!(room_id = %cli.room, user_id = %user_id, "joined");

    let mut opponents = RemoteBoards::new(user_id.clone());
    let mut round: Option<Round> = None;
    let mut start_requested = false;
    let mut rounds_played = 0;
    let move_every = Duration::from_millis(cli.move_ms.max(1));
    let mut next_move = Instant::now() + move_every;
    let mut frame = time::interval(Duration::from_millis(u64::from(TICK_MS)));
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            event = client.recv() => {
                let Some(event) = event else {
                    tracing::warn!("server closed the connection");
                    break;
                };
                opponents.apply(&event);
                match event {
                    ServerEvent::RoomState { players, creator, phase, .. } => {
                        let is_creator = creator.as_deref() == Some(user_id.as_str());
                        if cli.start
                            && is_creator
                            && !start_requested
                            && phase == RoomPhase::Waiting
                            && players.len() >= cli.min_players
                        {
                            start_requested = true;
                            client
                                .send(&ClientEvent::StartGame {
                                    room_id: cli.room.clone(),
                                    user_id: user_id.clone(),
                                })
                                .await?;
                        }
                    }
                    ServerEvent::MoveToTetrisPage { room_id } => {
                        client.send(&ClientEvent::TetrisPageLoaded { room_id }).await?;
                    }
                    ServerEvent::GameStart { .. } if round.is_none() => {
                        let engine = LocalEngine::new(rng.gen(), GameMode::Battle, hazards);
                        let session = EngineSession::spawn(engine, SessionConfig::default());
                        let sync = SyncChannel::spawn(
                            cli.room.clone(),
                            Duration::from_millis(cli.sync_ms),
                            session.snapshots(),
                            client.outbound(),
                        );
                        round = Some(Round { session, _sync: sync });
                        tracing::info!(room_id = %cli.room, "round started");
                    }
                    ServerEvent::TargetAssigned { target_name, .. } => {
                        tracing::info!(target = %target_name, "new target");
                    }
                    ServerEvent::ReceiveGarbage { lines } => {
                        if let Some(round) = &round {
                            round.session.send(SessionCommand::Garbage { lines })?;
                        }
                    }
                    ServerEvent::GameWin { winner, .. } => {
                        round = None;
                        rounds_played += 1;
                        let won = winner.as_deref() == Some(user_id.as_str());
                        for (id, board) in opponents.iter() {
                            tracing::debug!(
                                opponent = %id,
                                name = %board.player_name,
                                score = board.snapshot.score,
                                lines = board.snapshot.lines,
                                "final opponent board"
                            );
                        }
                        tracing::info!(winner = ?winner, won, rounds_played, "round over");
                        if rounds_played >= cli.rounds {
                            break;
                        }
                        client
                            .send(&ClientEvent::RestartGame { room_id: cli.room.clone() })
                            .await?;
                    }
                    ServerEvent::GameRestart { .. } => start_requested = false,
                    ServerEvent::Rejected { code, message } => {
                        tracing::warn!(code = code.as_str(), %message, "server rejected event");
                    }
                    _ => {}
                }
            }
            _ = frame.tick() => {
                let Some(current) = round.as_mut() else {
                    continue;
                };
                if Instant::now() >= next_move {
                    next_move = Instant::now() + move_every;
                    for action in random_placement(&mut rng) {
                        tracing::trace!(action = action.as_str(), "bot input");
                        current.session.act(action)?;
                    }
                }
                while let Some(event) = current.session.try_next_event() {
                    match event {
                        EngineEvent::LinesCleared { count } => {
                            client
                                .send(&ClientEvent::LineCleared {
                                    room_id: cli.room.clone(),
                                    lines_cleared: count,
                                })
                                .await?;
                        }
                        EngineEvent::GameOver { score } => {
                            tracing::info!(score, "topped out");
                            client
                                .send(&ClientEvent::GameOver { room_id: cli.room.clone(), score })
                                .await?;
                        }
                        EngineEvent::LevelUp { .. } | EngineEvent::SprintCompleted { .. } => {}
                    }
                }
            }
        }
    }

    let _ = client
        .send(&ClientEvent::LeaveRoom {
            room_id: cli.room.clone(),
            user_id,
        })
        .await;
    client.close().await;
    Ok(())
}
