//! Battle coordinator - room lifecycle and the rules of a round
//!
//! The coordinator is synchronous: every handler takes one inbound event and
//! returns the events to deliver, addressed by connection. The TCP runtime
//! feeds it from a single task, so handlers never race each other.
//!
//! ```text
//! Waiting --startGame--> Starting --all loaded / grace--> InProgress
//!    ^                                                        |
//!    +------- all restart acks ------- Finished <--- win -----+
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tetris_battle_core::scoring::attack_lines_with;
use tetris_battle_protocol::{BoardSnapshot, ClientEvent, RejectCode, RoomPhase, ServerEvent};

use crate::config::ServerConfig;
use crate::registry::RoomRegistry;
use crate::room::{ConnId, Room};
use crate::scheduler::{Scheduler, TimerKind, TimerTick};
use crate::targets::assign_targets;

/// An event addressed to one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub conn: ConnId,
    pub event: ServerEvent,
}

#[derive(Debug, Default)]
struct Outbox(Vec<Outgoing>);

impl Outbox {
    fn send(&mut self, conn: ConnId, event: ServerEvent) {
        self.0.push(Outgoing { conn, event });
    }

    fn broadcast(&mut self, room: &Room, except: Option<&str>, event: ServerEvent) {
        for conn in room.conns_except(except) {
            self.send(conn, event.clone());
        }
    }

    fn broadcast_state(&mut self, room: &Room) {
        let state = room.state_event();
        self.broadcast(room, None, state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rejection {
    code: RejectCode,
    message: String,
}

impl Rejection {
    fn new(code: RejectCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

type Handled = Result<(), Rejection>;

/// Round rules that need the scheduler or the seed source
struct Referee<S> {
    scheduler: S,
    rng: StdRng,
    config: ServerConfig,
}

impl<S: Scheduler> Referee<S> {
    fn tick(room: &Room, kind: TimerKind) -> TimerTick {
        TimerTick {
            room_id: room.id.clone(),
            epoch: room.epoch,
            kind,
        }
    }

    fn begin_starting(&self, room: &mut Room, out: &mut Outbox) {
        room.enter_phase(RoomPhase::Starting);
        room.loaded.clear();
        room.timers.start_grace = Some(
            self.scheduler
                .after(self.config.start_grace, Self::tick(room, TimerKind::StartGrace)),
        );
        tracing::info!(room_id = %room.id, players = room.player_count(), "room starting");
        out.broadcast(
            room,
            None,
            ServerEvent::MoveToTetrisPage {
                room_id: room.id.clone(),
            },
        );
    }

    fn begin_round(&mut self, room: &mut Room, out: &mut Outbox) {
        room.enter_phase(RoomPhase::InProgress);
        room.round_seed = self.rng.gen();
        room.round_size = room.player_count();
        room.target_epoch = 0;
        room.game_states.clear();
        room.restart_acks.clear();
        room.loaded.clear();
        for player in room.players.values_mut() {
            player.is_game_over = false;
            player.score = 0;
        }
        tracing::info!(room_id = %room.id, players = room.round_size, "round started");

        out.broadcast(
            room,
            None,
            ServerEvent::GameStart {
                room_id: room.id.clone(),
            },
        );
        retarget(room, out);
        room.timers.retarget = Some(
            self.scheduler
                .every(self.config.retarget_period, Self::tick(room, TimerKind::Retarget)),
        );
        out.broadcast_state(room);
    }
}

/// Re-roll targets for the next target epoch and tell every attacker
fn retarget(room: &mut Room, out: &mut Outbox) {
    room.target_epoch += 1;
    room.targets = assign_targets(&room.active_ids(), room.round_seed, room.target_epoch);
    let attackers: Vec<String> = room.targets.keys().cloned().collect();
    for attacker in attackers {
        if let Some((conn, event)) = room.target_event(&attacker) {
            out.send(conn, event);
        }
    }
    tracing::debug!(
        room_id = %room.id,
        epoch = room.target_epoch,
        pairs = room.targets.len(),
        "targets assigned"
    );
}

/// Finish the round if its outcome is decided; returns true when it ended
///
/// The phase change is the latch: once Finished, nothing here runs again for
/// the same round.
fn check_win(room: &mut Room, out: &mut Outbox) -> bool {
    if room.phase != RoomPhase::InProgress {
        return false;
    }
    let active = room.active_ids();
    let winner = match active.as_slice() {
        [] => None,
        [last] if room.round_size > 1 => Some(last.clone()),
        _ => return false,
    };

    room.enter_phase(RoomPhase::Finished);
    room.targets.clear();
    tracing::info!(room_id = %room.id, winner = ?winner, "round finished");
    out.broadcast(
        room,
        None,
        ServerEvent::GameWin {
            winner,
            players: room.player_infos(),
        },
    );
    true
}

/// Back to Waiting once every present player acknowledged the restart
fn reset_if_all_acked(room: &mut Room, out: &mut Outbox) -> bool {
    if room.phase != RoomPhase::Finished || !room.all_acked() {
        return false;
    }
    room.enter_phase(RoomPhase::Waiting);
    room.restart_acks.clear();
    room.game_states.clear();
    room.targets.clear();
    room.loaded.clear();
    for player in room.players.values_mut() {
        player.is_game_over = false;
        player.score = 0;
    }
    tracing::info!(room_id = %room.id, "room reset for a new round");
    out.broadcast(
        room,
        None,
        ServerEvent::GameRestart {
            room_id: room.id.clone(),
        },
    );
    true
}

/// Borrow a room out of the registry, leaving the referee free
fn find_room<'a>(registry: &'a mut RoomRegistry, room_id: &str) -> Result<&'a mut Room, Rejection> {
    registry.room_mut(room_id).ok_or_else(|| {
        Rejection::new(
            RejectCode::RoomNotFound,
            format!("room {room_id} does not exist"),
        )
    })
}

/// Owns every room and applies client events to them
pub struct BattleCoordinator<S> {
    registry: RoomRegistry,
    referee: Referee<S>,
}

impl<S: Scheduler> BattleCoordinator<S> {
    pub fn new(config: ServerConfig, scheduler: S) -> Self {
        Self::with_rng(config, scheduler, StdRng::from_entropy())
    }

    /// Deterministic round seeds, for tests and replays
    pub fn with_seed(config: ServerConfig, scheduler: S, seed: u64) -> Self {
        Self::with_rng(config, scheduler, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ServerConfig, scheduler: S, rng: StdRng) -> Self {
        Self {
            registry: RoomRegistry::new(),
            referee: Referee {
                scheduler,
                rng,
                config,
            },
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.registry.room(room_id)
    }

    pub fn handle_event(&mut self, conn: ConnId, event: ClientEvent) -> Vec<Outgoing> {
        let mut out = Outbox::default();
        let kind = event.kind();
        let result = match event {
            ClientEvent::JoinRoom {
                room_id,
                player_name,
                user_id,
            } => self.join(conn, &room_id, &player_name, &user_id, &mut out),
            ClientEvent::LeaveRoom { room_id, user_id } => {
                self.leave(conn, &room_id, &user_id, &mut out)
            }
            ClientEvent::StartGame { room_id, user_id } => {
                self.start_game(conn, &room_id, &user_id, &mut out)
            }
            ClientEvent::RestartGame { room_id } => self.restart_game(conn, &room_id, &mut out),
            ClientEvent::UpdateGameState {
                room_id,
                game_state,
            } => self.update_game_state(conn, &room_id, game_state, &mut out),
            ClientEvent::GameOver { room_id, score } => {
                self.game_over(conn, &room_id, score, &mut out)
            }
            ClientEvent::LineCleared {
                room_id,
                lines_cleared,
            } => self.line_cleared(conn, &room_id, lines_cleared, &mut out),
            ClientEvent::TetrisPageLoaded { room_id } => {
                self.page_loaded(conn, &room_id, &mut out)
            }
        };

        if let Err(rejection) = result {
            tracing::debug!(
                conn_id = conn,
                event = kind,
                code = rejection.code.as_str(),
                "event rejected"
            );
            out.send(
                conn,
                ServerEvent::rejected(rejection.code, rejection.message),
            );
        }
        out.0
    }

    /// The connection closed; remove whoever it spoke for
    ///
    /// A connection superseded by a reconnect is no longer mapped, so its
    /// close is a no-op.
    pub fn handle_disconnect(&mut self, conn: ConnId) -> Vec<Outgoing> {
        let mut out = Outbox::default();
        if let Some(membership) = self.registry.unbind(conn) {
            let current = self
                .registry
                .room(&membership.room_id)
                .and_then(|room| room.player(&membership.user_id))
                .map(|player| player.conn);
            if current == Some(conn) {
                tracing::info!(
                    conn_id = conn,
                    room_id = %membership.room_id,
                    user_id = %membership.user_id,
                    "player disconnected"
                );
                self.remove_member(&membership.room_id, &membership.user_id, &mut out);
            }
        }
        out.0
    }

    pub fn handle_timer(&mut self, tick: TimerTick) -> Vec<Outgoing> {
        let mut out = Outbox::default();
        let Some(room) = self.registry.room_mut(&tick.room_id) else {
            return out.0;
        };
        if room.epoch != tick.epoch {
            tracing::trace!(room_id = %tick.room_id, kind = ?tick.kind, "stale timer tick");
            return out.0;
        }
        match (tick.kind, room.phase) {
            (TimerKind::StartGrace, RoomPhase::Starting) => {
                tracing::info!(
                    room_id = %room.id,
                    loaded = room.loaded.len(),
                    players = room.player_count(),
                    "start grace expired"
                );
                self.referee.begin_round(room, &mut out);
            }
            (TimerKind::Retarget, RoomPhase::InProgress) => retarget(room, &mut out),
            _ => {}
        }
        out.0
    }

    /// The player `conn` speaks for in `room_id`
    fn sender(&self, conn: ConnId, room_id: &str) -> Result<String, Rejection> {
        if self.registry.room(room_id).is_none() {
            return Err(Rejection::new(
                RejectCode::RoomNotFound,
                format!("room {room_id} does not exist"),
            ));
        }
        self.registry
            .member_of(conn, room_id)
            .map(str::to_string)
            .ok_or_else(|| {
                Rejection::new(RejectCode::NotJoined, format!("not a member of {room_id}"))
            })
    }

    fn join(
        &mut self,
        conn: ConnId,
        room_id: &str,
        player_name: &str,
        user_id: &str,
        out: &mut Outbox,
    ) -> Handled {
        if let Some(previous) = self.registry.membership(conn).cloned() {
            if previous.room_id != room_id || previous.user_id != user_id {
                self.registry.unbind(conn);
                self.remove_member(&previous.room_id, &previous.user_id, out);
            }
        }

        let (room, created) = self.registry.room_or_create(room_id);
        if created {
            tracing::info!(room_id, user_id, "room created");
        }

        if let Some(player) = room.players.get_mut(user_id) {
            let old_conn = std::mem::replace(&mut player.conn, conn);
            out.send(conn, room.state_event());
            if old_conn != conn {
                self.registry.unbind_if(old_conn, room_id, user_id);
            }
            self.registry.bind(conn, room_id, user_id);
            tracing::info!(conn_id = conn, room_id, user_id, "player reconnected");
            return Ok(());
        }

        if matches!(room.phase, RoomPhase::Starting | RoomPhase::InProgress) {
            return Err(Rejection::new(
                RejectCode::AlreadyStarted,
                format!("room {room_id} is already playing"),
            ));
        }

        room.add_player(user_id, player_name, conn);
        if let Some(info) = room.player(user_id).map(|p| p.info()) {
            let player_count = room.player_count();
            out.broadcast(
                room,
                Some(user_id),
                ServerEvent::PlayerJoined {
                    player: info,
                    player_count,
                },
            );
        }
        out.send(conn, room.state_event());
        tracing::info!(
            conn_id = conn,
            room_id,
            user_id,
            players = room.player_count(),
            "player joined"
        );
        self.registry.bind(conn, room_id, user_id);
        Ok(())
    }

    fn leave(&mut self, conn: ConnId, room_id: &str, user_id: &str, out: &mut Outbox) -> Handled {
        if self.registry.member_of(conn, room_id) != Some(user_id) {
            return Err(Rejection::new(
                RejectCode::NotJoined,
                format!("{user_id} is not in {room_id} on this connection"),
            ));
        }
        self.registry.unbind(conn);
        tracing::info!(conn_id = conn, room_id, user_id, "player left");
        self.remove_member(room_id, user_id, out);
        Ok(())
    }

    /// Remove a player and repair whatever the room's phase depends on
    fn remove_member(&mut self, room_id: &str, user_id: &str, out: &mut Outbox) {
        let Some(room) = self.registry.room_mut(room_id) else {
            return;
        };
        let Some(conn) = room.player(user_id).map(|p| p.conn) else {
            return;
        };
        let new_creator = room.remove_player(user_id);
        out.broadcast(
            room,
            None,
            ServerEvent::PlayerDisconnect {
                user_id: user_id.to_string(),
            },
        );

        if room.is_empty() {
            self.registry.remove_room(room_id);
            self.registry.unbind_if(conn, room_id, user_id);
            tracing::info!(room_id, "room closed");
            return;
        }

        if let Some(new_creator_id) = new_creator {
            tracing::info!(room_id, creator = %new_creator_id, "creator reassigned");
            out.broadcast(room, None, ServerEvent::CreatorChanged { new_creator_id });
        }

        match room.phase {
            RoomPhase::Waiting => {}
            RoomPhase::Starting => {
                if room.player_count() < self.referee.config.min_players {
                    room.enter_phase(RoomPhase::Waiting);
                    room.loaded.clear();
                    tracing::info!(
                        room_id,
                        players = room.player_count(),
                        "start aborted, not enough players"
                    );
                } else if room.all_loaded() {
                    self.referee.begin_round(room, out);
                }
            }
            RoomPhase::InProgress => {
                if !check_win(room, out) {
                    retarget(room, out);
                }
            }
            RoomPhase::Finished => {
                reset_if_all_acked(room, out);
            }
        }
        out.broadcast_state(room);
        self.registry.unbind_if(conn, room_id, user_id);
    }

    fn start_game(
        &mut self,
        conn: ConnId,
        room_id: &str,
        user_id: &str,
        out: &mut Outbox,
    ) -> Handled {
        let sender = self.sender(conn, room_id)?;
        if sender != user_id {
            return Err(Rejection::new(
                RejectCode::NotJoined,
                format!("{user_id} is not in {room_id} on this connection"),
            ));
        }
        let min_players = self.referee.config.min_players;
        let room = find_room(&mut self.registry, room_id)?;
        if room.creator() != Some(user_id) {
            return Err(Rejection::new(
                RejectCode::NotAuthorized,
                "only the room creator can start the game",
            ));
        }
        if room.phase != RoomPhase::Waiting {
            return Err(Rejection::new(
                RejectCode::AlreadyStarted,
                format!("room {room_id} is already playing"),
            ));
        }
        if room.player_count() < min_players {
            return Err(Rejection::new(
                RejectCode::NotEnoughPlayers,
                format!("need at least {min_players} players"),
            ));
        }

        self.referee.begin_starting(room, out);
        Ok(())
    }

    fn page_loaded(&mut self, conn: ConnId, room_id: &str, out: &mut Outbox) -> Handled {
        let user_id = self.sender(conn, room_id)?;
        let Some(room) = self.registry.room_mut(room_id) else {
            return Ok(());
        };
        match room.phase {
            RoomPhase::Starting => {
                room.loaded.insert(user_id);
                if room.all_loaded() {
                    self.referee.begin_round(room, out);
                }
            }
            RoomPhase::InProgress => {
                // Late or reloaded page: catch it up with the running round
                out.send(
                    conn,
                    ServerEvent::GameStart {
                        room_id: room_id.to_string(),
                    },
                );
                if let Some((conn, event)) = room.target_event(&user_id) {
                    out.send(conn, event);
                }
            }
            RoomPhase::Waiting | RoomPhase::Finished => {}
        }
        Ok(())
    }

    fn update_game_state(
        &mut self,
        conn: ConnId,
        room_id: &str,
        game_state: BoardSnapshot,
        out: &mut Outbox,
    ) -> Handled {
        let user_id = self.sender(conn, room_id)?;
        let room = find_room(&mut self.registry, room_id)?;
        if room.phase != RoomPhase::InProgress {
            return Ok(());
        }
        let Some(player) = room.players.get_mut(&user_id) else {
            return Ok(());
        };
        player.score = game_state.score;
        let player_name = player.display_name.clone();

        room.game_states.insert(user_id.clone(), game_state.clone());
        out.broadcast(
            room,
            Some(&user_id),
            ServerEvent::GameStateUpdate {
                player_id: user_id.clone(),
                player_name,
                game_state,
            },
        );
        Ok(())
    }

    fn game_over(&mut self, conn: ConnId, room_id: &str, score: u32, out: &mut Outbox) -> Handled {
        let user_id = self.sender(conn, room_id)?;
        let room = find_room(&mut self.registry, room_id)?;
        if room.phase != RoomPhase::InProgress {
            return Ok(());
        }
        let Some(player) = room.players.get_mut(&user_id) else {
            return Ok(());
        };
        if player.is_game_over {
            return Ok(());
        }
        player.is_game_over = true;
        player.score = score;
        tracing::info!(room_id, user_id = %user_id, score, "player topped out");

        out.broadcast(
            room,
            None,
            ServerEvent::PlayerGameOver {
                player_id: user_id,
                score,
            },
        );
        if !check_win(room, out) {
            retarget(room, out);
        }
        Ok(())
    }

    fn line_cleared(
        &mut self,
        conn: ConnId,
        room_id: &str,
        lines_cleared: u32,
        out: &mut Outbox,
    ) -> Handled {
        let user_id = self.sender(conn, room_id)?;
        let lines = attack_lines_with(&self.referee.config.attack_table, lines_cleared as usize);
        let room = find_room(&mut self.registry, room_id)?;
        if room.phase != RoomPhase::InProgress || lines == 0 {
            return Ok(());
        }
        if room.player(&user_id).map_or(true, |p| p.is_game_over) {
            return Ok(());
        }
        let Some(defender) = room
            .targets
            .get(&user_id)
            .and_then(|target| room.player(target))
            .filter(|p| !p.is_game_over)
        else {
            return Ok(());
        };
        tracing::debug!(
            room_id,
            attacker = %user_id,
            defender = %defender.user_id,
            lines,
            "garbage sent"
        );
        out.send(defender.conn, ServerEvent::ReceiveGarbage { lines });
        Ok(())
    }

    fn restart_game(&mut self, conn: ConnId, room_id: &str, out: &mut Outbox) -> Handled {
        let user_id = self.sender(conn, room_id)?;
        let room = find_room(&mut self.registry, room_id)?;
        if room.phase != RoomPhase::Finished {
            return Err(Rejection::new(
                RejectCode::NotFinished,
                "the round has not finished",
            ));
        }
        room.restart_acks.insert(user_id.clone());
        let restarted_count = room.restart_acks.len();
        let total_players = room.player_count();
        tracing::debug!(room_id, user_id = %user_id, restarted_count, total_players, "restart acknowledged");
        out.broadcast(
            room,
            None,
            ServerEvent::PlayerRestarted {
                player_id: user_id,
                restarted_count,
                total_players,
            },
        );
        if reset_if_all_acked(room, out) {
            out.broadcast_state(room);
        }
        Ok(())
    }
}
