//! Best-effort board broadcast and the receiving side's view of opponents
//!
//! [`SyncChannel`] samples the latest local snapshot on a fixed period and
//! ships it as `updateGameState`. Only the newest snapshot matters, so a full
//! outbound queue drops the update instead of waiting. [`RemoteBoards`] keeps
//! the last snapshot per sender and never assumes delivery order.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};

use tetris_battle_core::{BoardSnapshot, TimerGuard};
use tetris_battle_protocol::{encode_line, ClientEvent, ServerEvent};

pub const DEFAULT_SYNC_PERIOD: Duration = Duration::from_millis(50);
pub const MIN_SYNC_PERIOD: Duration = Duration::from_millis(10);
pub const MAX_SYNC_PERIOD: Duration = Duration::from_millis(100);

pub fn clamp_sync_period(period: Duration) -> Duration {
    period.clamp(MIN_SYNC_PERIOD, MAX_SYNC_PERIOD)
}

/// Periodic snapshot sender; dropping it stops the broadcast
#[derive(Debug)]
pub struct SyncChannel {
    period: Duration,
    _task: TimerGuard,
}

impl SyncChannel {
    pub fn spawn(
        room_id: impl Into<String>,
        period: Duration,
        mut snapshots: watch::Receiver<BoardSnapshot>,
        outbound: mpsc::Sender<String>,
    ) -> Self {
        let room_id = room_id.into();
        let period = clamp_sync_period(period);
        // The first tick ships whatever the board looks like right now
        snapshots.mark_changed();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match snapshots.has_changed() {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(_) => break,
                }
                let game_state = snapshots.borrow_and_update().clone();
                let event = ClientEvent::UpdateGameState {
                    room_id: room_id.clone(),
                    game_state,
                };
                let line = match encode_line(&event) {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode snapshot");
                        continue;
                    }
                };
                match outbound.try_send(line) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::trace!(room_id = %room_id, "outbound queue full, snapshot dropped");
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        });

        Self {
            period,
            _task: TimerGuard::new(move || handle.abort()),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBoard {
    pub player_name: String,
    pub snapshot: BoardSnapshot,
}

/// Opponent boards keyed by player id, last write wins
#[derive(Debug, Clone, Default)]
pub struct RemoteBoards {
    own_id: Option<String>,
    boards: BTreeMap<String, RemoteBoard>,
}

impl RemoteBoards {
    /// Boards of everyone except `own_id`
    pub fn new(own_id: impl Into<String>) -> Self {
        Self {
            own_id: Some(own_id.into()),
            boards: BTreeMap::new(),
        }
    }

    /// Fold a server event into the view; returns true if anything changed
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::GameStateUpdate {
                player_id,
                player_name,
                game_state,
            } => self.store(player_id, player_name, game_state),
            ServerEvent::PlayerDisconnect { user_id } => self.boards.remove(user_id).is_some(),
            ServerEvent::GameStart { .. } | ServerEvent::GameRestart { .. } => {
                let changed = !self.boards.is_empty();
                self.boards.clear();
                changed
            }
            ServerEvent::RoomState {
                players,
                game_states,
                ..
            } => {
                let before = self.boards.len();
                self.boards
                    .retain(|id, _| players.iter().any(|p| &p.user_id == id));
                let mut changed = self.boards.len() != before;
                for board in game_states {
                    let name = players
                        .iter()
                        .find(|p| p.user_id == board.player_id)
                        .map(|p| p.display_name.as_str())
                        .unwrap_or(board.player_id.as_str());
                    changed |= self.store(&board.player_id, name, &board.game_state);
                }
                changed
            }
            _ => false,
        }
    }

    fn store(&mut self, player_id: &str, player_name: &str, snapshot: &BoardSnapshot) -> bool {
        if self.own_id.as_deref() == Some(player_id) {
            return false;
        }
        let board = RemoteBoard {
            player_name: player_name.to_string(),
            snapshot: snapshot.clone(),
        };
        self.boards.insert(player_id.to_string(), board.clone()) != Some(board)
    }

    pub fn get(&self, player_id: &str) -> Option<&RemoteBoard> {
        self.boards.get(player_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RemoteBoard)> {
        self.boards.iter().map(|(id, board)| (id.as_str(), board))
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetris_battle_protocol::{parse_client_line, ParsedMessage, PlayerBoard, PlayerInfo, RoomPhase};

    fn update(player: &str, score: u32) -> ServerEvent {
        ServerEvent::GameStateUpdate {
            player_id: player.into(),
            player_name: player.to_uppercase(),
            game_state: BoardSnapshot {
                score,
                ..BoardSnapshot::default()
            },
        }
    }

    #[test]
    fn period_is_clamped() {
        assert_eq!(clamp_sync_period(Duration::from_millis(1)), MIN_SYNC_PERIOD);
        assert_eq!(clamp_sync_period(Duration::from_secs(1)), MAX_SYNC_PERIOD);
        assert_eq!(clamp_sync_period(DEFAULT_SYNC_PERIOD), DEFAULT_SYNC_PERIOD);
    }

    #[test]
    fn last_write_wins_per_sender() {
        let mut boards = RemoteBoards::new("me");
        assert!(boards.apply(&update("a", 100)));
        assert!(boards.apply(&update("b", 50)));
        assert!(boards.apply(&update("a", 20)));
        assert!(!boards.apply(&update("a", 20)));
        assert!(!boards.apply(&update("me", 999)));

        assert_eq!(boards.len(), 2);
        assert_eq!(boards.get("a").map(|b| b.snapshot.score), Some(20));
        assert_eq!(boards.get("b").map(|b| b.player_name.as_str()), Some("B"));
    }

    #[test]
    fn departures_and_new_rounds_clear_boards() {
        let mut boards = RemoteBoards::new("me");
        boards.apply(&update("a", 1));
        boards.apply(&update("b", 1));
        assert!(boards.apply(&ServerEvent::PlayerDisconnect { user_id: "a".into() }));
        assert_eq!(boards.len(), 1);
        assert!(boards.apply(&ServerEvent::GameRestart { room_id: "r".into() }));
        assert!(boards.is_empty());
    }

    #[test]
    fn room_state_seeds_boards() {
        let mut boards = RemoteBoards::new("me");
        boards.apply(&update("gone", 1));
        let player = |id: &str| PlayerInfo {
            user_id: id.into(),
            display_name: format!("Player {id}"),
            is_game_over: false,
            score: 0,
        };
        let state = ServerEvent::RoomState {
            room_id: "r".into(),
            players: vec![player("me"), player("x")],
            game_states: vec![
                PlayerBoard {
                    player_id: "x".into(),
                    game_state: BoardSnapshot::default(),
                },
                PlayerBoard {
                    player_id: "me".into(),
                    game_state: BoardSnapshot::default(),
                },
            ],
            creator: Some("me".into()),
            phase: RoomPhase::InProgress,
        };
        assert!(boards.apply(&state));
        assert_eq!(boards.len(), 1);
        assert_eq!(boards.get("x").map(|b| b.player_name.as_str()), Some("Player x"));
    }

    #[tokio::test(start_paused = true)]
    async fn sync_channel_sends_latest_snapshot() {
        let (snapshot_tx, snapshot_rx) = watch::channel(BoardSnapshot::default());
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let _sync = SyncChannel::spawn("r1", DEFAULT_SYNC_PERIOD, snapshot_rx, out_tx);

        time::sleep(Duration::from_millis(10)).await;
        let first = out_rx.try_recv().expect("initial snapshot");
        assert!(matches!(
            parse_client_line(first.trim_end()),
            Ok(ParsedMessage::Event(ClientEvent::UpdateGameState { .. }))
        ));

        // Unchanged board: nothing more is sent
        time::sleep(Duration::from_millis(200)).await;
        assert!(out_rx.try_recv().is_err());

        // Several changes within one period collapse into one update
        for score in 1..=3 {
            snapshot_tx.send_replace(BoardSnapshot {
                score,
                ..BoardSnapshot::default()
            });
        }
        time::sleep(Duration::from_millis(60)).await;
        let line = out_rx.try_recv().expect("update after change");
        match parse_client_line(line.trim_end()) {
            Ok(ParsedMessage::Event(ClientEvent::UpdateGameState { game_state, room_id })) => {
                assert_eq!(room_id, "r1");
                assert_eq!(game_state.score, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_drops_updates() {
        let (snapshot_tx, snapshot_rx) = watch::channel(BoardSnapshot::default());
        let (out_tx, mut out_rx) = mpsc::channel(1);
        let _sync = SyncChannel::spawn("r1", Duration::from_millis(10), snapshot_rx, out_tx);

        for score in 1..=5 {
            snapshot_tx.send_replace(BoardSnapshot {
                score,
                ..BoardSnapshot::default()
            });
            time::sleep(Duration::from_millis(15)).await;
        }
        let mut received = 0;
        while out_rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 1);
    }
}
