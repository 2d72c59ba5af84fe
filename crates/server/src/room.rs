//! Room state owned by the coordinator
//!
//! A room is plain data plus the guards of its timers. Every phase change goes
//! through [`Room::enter_phase`], which bumps the epoch and drops the timers of
//! the previous phase, so a timer can only ever act on the phase that armed it.

use std::collections::{BTreeMap, BTreeSet};

use tetris_battle_core::TimerGuard;
use tetris_battle_protocol::{BoardSnapshot, PlayerBoard, PlayerInfo, RoomPhase, ServerEvent};

use crate::targets::TargetMap;

/// Server-assigned connection id
pub type ConnId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSession {
    pub user_id: String,
    pub display_name: String,
    pub conn: ConnId,
    pub is_game_over: bool,
    pub score: u32,
    /// Join order, used to pick the next creator
    pub joined_seq: u64,
}

impl PlayerSession {
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            user_id: self.user_id.clone(),
            display_name: self.display_name.clone(),
            is_game_over: self.is_game_over,
            score: self.score,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RoomTimers {
    pub start_grace: Option<TimerGuard>,
    pub retarget: Option<TimerGuard>,
}

#[derive(Debug)]
pub struct Room {
    pub(crate) id: String,
    pub(crate) players: BTreeMap<String, PlayerSession>,
    pub(crate) creator_id: Option<String>,
    pub(crate) phase: RoomPhase,
    pub(crate) game_states: BTreeMap<String, BoardSnapshot>,
    pub(crate) targets: TargetMap,
    pub(crate) restart_acks: BTreeSet<String>,
    /// Players that reported their game page loaded (Starting only)
    pub(crate) loaded: BTreeSet<String>,
    pub(crate) round_seed: u64,
    /// Players present when the round began
    pub(crate) round_size: usize,
    pub(crate) epoch: u64,
    pub(crate) target_epoch: u64,
    next_join_seq: u64,
    pub(crate) timers: RoomTimers,
}

impl Room {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_epoch(id, 0)
    }

    /// Start counting epochs at `epoch`, so ticks armed by an earlier room
    /// under the same id never match this one
    pub(crate) fn with_epoch(id: impl Into<String>, epoch: u64) -> Self {
        Self {
            id: id.into(),
            players: BTreeMap::new(),
            creator_id: None,
            phase: RoomPhase::Waiting,
            game_states: BTreeMap::new(),
            targets: TargetMap::new(),
            restart_acks: BTreeSet::new(),
            loaded: BTreeSet::new(),
            round_seed: 0,
            round_size: 0,
            epoch,
            target_epoch: 0,
            next_join_seq: 0,
            timers: RoomTimers::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    pub fn creator(&self) -> Option<&str> {
        self.creator_id.as_deref()
    }

    pub fn player(&self, user_id: &str) -> Option<&PlayerSession> {
        self.players.get(user_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn targets(&self) -> &TargetMap {
        &self.targets
    }

    pub fn restart_acks(&self) -> &BTreeSet<String> {
        &self.restart_acks
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn has_timers(&self) -> bool {
        self.timers.start_grace.is_some() || self.timers.retarget.is_some()
    }

    /// Insert a new player; the first player becomes creator
    pub(crate) fn add_player(&mut self, user_id: &str, display_name: &str, conn: ConnId) {
        let session = PlayerSession {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            conn,
            is_game_over: false,
            score: 0,
            joined_seq: self.next_join_seq,
        };
        self.next_join_seq += 1;
        self.players.insert(user_id.to_string(), session);
        if self.creator_id.is_none() {
            self.creator_id = Some(user_id.to_string());
        }
    }

    /// Drop a player and everything keyed by it
    ///
    /// Returns the new creator id when the leaving player was the creator and
    /// someone is left to take over.
    pub(crate) fn remove_player(&mut self, user_id: &str) -> Option<String> {
        self.players.remove(user_id)?;
        self.game_states.remove(user_id);
        self.restart_acks.remove(user_id);
        self.loaded.remove(user_id);
        self.targets
            .retain(|attacker, defender| attacker != user_id && defender != user_id);

        if self.creator_id.as_deref() != Some(user_id) {
            return None;
        }
        self.creator_id = self
            .players
            .values()
            .min_by_key(|p| p.joined_seq)
            .map(|p| p.user_id.clone());
        self.creator_id.clone()
    }

    /// Change phase, invalidate outstanding ticks and cancel every timer
    pub(crate) fn enter_phase(&mut self, phase: RoomPhase) {
        self.phase = phase;
        self.epoch += 1;
        self.timers = RoomTimers::default();
    }

    /// Ids of players still in the round, sorted
    pub fn active_ids(&self) -> Vec<String> {
        self.players
            .values()
            .filter(|p| !p.is_game_over)
            .map(|p| p.user_id.clone())
            .collect()
    }

    pub fn player_infos(&self) -> Vec<PlayerInfo> {
        let mut sessions: Vec<&PlayerSession> = self.players.values().collect();
        sessions.sort_by_key(|p| p.joined_seq);
        sessions.into_iter().map(PlayerSession::info).collect()
    }

    /// Every present player reported its game page loaded
    pub fn all_loaded(&self) -> bool {
        self.players.keys().all(|id| self.loaded.contains(id))
    }

    /// Every present player acknowledged the restart
    pub fn all_acked(&self) -> bool {
        !self.players.is_empty() && self.players.keys().all(|id| self.restart_acks.contains(id))
    }

    /// `targetAssigned` for whoever `attacker` currently targets
    pub(crate) fn target_event(&self, attacker: &str) -> Option<(ConnId, ServerEvent)> {
        let attacker = self.players.get(attacker)?;
        let defender = self.players.get(self.targets.get(&attacker.user_id)?)?;
        Some((
            attacker.conn,
            ServerEvent::TargetAssigned {
                target_id: defender.user_id.clone(),
                target_name: defender.display_name.clone(),
            },
        ))
    }

    /// Connections of every player except `except`
    pub(crate) fn conns_except(&self, except: Option<&str>) -> Vec<ConnId> {
        self.players
            .values()
            .filter(|p| Some(p.user_id.as_str()) != except)
            .map(|p| p.conn)
            .collect()
    }

    pub fn state_event(&self) -> ServerEvent {
        ServerEvent::RoomState {
            room_id: self.id.clone(),
            players: self.player_infos(),
            game_states: self
                .game_states
                .iter()
                .map(|(player_id, snapshot)| PlayerBoard {
                    player_id: player_id.clone(),
                    game_state: snapshot.clone(),
                })
                .collect(),
            creator: self.creator_id.clone(),
            phase: self.phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_passes_to_earliest_joined() {
        let mut room = Room::new("r");
        room.add_player("zed", "Zed", 1);
        room.add_player("amy", "Amy", 2);
        room.add_player("bob", "Bob", 3);
        assert_eq!(room.creator(), Some("zed"));

        assert_eq!(room.remove_player("zed"), Some("amy".to_string()));
        assert_eq!(room.creator(), Some("amy"));
        assert_eq!(room.remove_player("bob"), None);
        assert_eq!(room.remove_player("amy"), None);
        assert!(room.is_empty());
        assert_eq!(room.creator(), None);
    }

    #[test]
    fn remove_player_purges_targets() {
        let mut room = Room::new("r");
        for (i, id) in ["a", "b", "c"].into_iter().enumerate() {
            room.add_player(id, id, i as ConnId);
        }
        room.targets.insert("a".into(), "b".into());
        room.targets.insert("b".into(), "c".into());
        room.targets.insert("c".into(), "a".into());
        room.remove_player("b");
        assert_eq!(room.targets.len(), 1);
        assert_eq!(room.targets.get("c").map(String::as_str), Some("a"));
    }

    #[test]
    fn enter_phase_bumps_epoch_and_drops_timers() {
        let mut room = Room::new("r");
        room.timers.retarget = Some(TimerGuard::inert());
        let before = room.epoch();
        room.enter_phase(RoomPhase::Finished);
        assert_eq!(room.epoch(), before + 1);
        assert!(!room.has_timers());
    }
}
