//! Rooms and connection membership
//!
//! Owned by the coordinator task only. A connection is a member of at most one
//! room at a time; the mapping is what lets a disconnect find its player.

use std::collections::HashMap;

use crate::room::{ConnId, Room};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room_id: String,
    pub user_id: String,
}

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    connections: HashMap<ConnId, Membership>,
    /// Above every epoch a removed room reached
    epoch_floor: u64,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub(crate) fn room_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    /// Returns the room and whether it was just created
    pub(crate) fn room_or_create(&mut self, room_id: &str) -> (&mut Room, bool) {
        let created = !self.rooms.contains_key(room_id);
        let floor = self.epoch_floor;
        let room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room::with_epoch(room_id, floor));
        (room, created)
    }

    /// Dropping the room also drops its timer guards
    pub(crate) fn remove_room(&mut self, room_id: &str) -> Option<Room> {
        let room = self.rooms.remove(room_id)?;
        self.epoch_floor = self.epoch_floor.max(room.epoch() + 1);
        Some(room)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn membership(&self, conn: ConnId) -> Option<&Membership> {
        self.connections.get(&conn)
    }

    pub(crate) fn bind(&mut self, conn: ConnId, room_id: &str, user_id: &str) {
        self.connections.insert(
            conn,
            Membership {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
            },
        );
    }

    pub(crate) fn unbind(&mut self, conn: ConnId) -> Option<Membership> {
        self.connections.remove(&conn)
    }

    /// Unbind `conn` only if it still maps to `room_id`/`user_id`
    pub(crate) fn unbind_if(&mut self, conn: ConnId, room_id: &str, user_id: &str) {
        if self
            .connections
            .get(&conn)
            .is_some_and(|m| m.room_id == room_id && m.user_id == user_id)
        {
            self.connections.remove(&conn);
        }
    }

    /// The player a connection speaks for in `room_id`
    pub fn member_of(&self, conn: ConnId, room_id: &str) -> Option<&str> {
        self.connections
            .get(&conn)
            .filter(|m| m.room_id == room_id)
            .map(|m| m.user_id.as_str())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
