//! Room membership registry.
//!
//! Plain data owned by the hub loop; nothing here is shared or locked. A room
//! key exists only while at least one connection is registered in it.

use std::collections::HashMap;
use std::sync::Arc;

use rooms_core::Message;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::connection::{Connection, ConnectionId, ConnectionState};
use crate::subscription::Subscription;

/// A registered connection and the only sending half of its outbound queue.
///
/// Dropping a `Member` closes that queue.
#[derive(Debug)]
pub(crate) struct Member {
    conn: Arc<Connection>,
    outbound: mpsc::Sender<Arc<Message>>,
}

impl Member {
    pub(crate) fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// Close the outbound queue and mark the connection as closing.
    pub(crate) fn close(self) {
        self.conn.advance(ConnectionState::Closing);
    }
}

/// Why a connection was dropped during a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Eviction {
    /// The queue had no room left.
    Full,
    /// The write pump has already gone away.
    Gone,
}

/// Outcome of fanning one message out to a room.
#[derive(Debug, Default)]
pub(crate) struct Delivery {
    pub delivered: usize,
    pub evicted: Vec<(Member, Eviction)>,
}

/// Point-in-time registry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub rooms: usize,
    pub connections: usize,
}

/// One live connection in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    pub connection_id: ConnectionId,
    pub user_id: String,
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    rooms: HashMap<String, HashMap<ConnectionId, Member>>,
}

impl Registry {
    /// Add a connection to its room. Returns false when nothing changed:
    /// the connection is already registered, or it has been closed and its
    /// queue released.
    pub(crate) fn insert(&mut self, sub: &Subscription) -> bool {
        if self
            .rooms
            .get(sub.room_id())
            .is_some_and(|room| room.contains_key(&sub.connection_id()))
        {
            return false;
        }

        let conn = sub.connection();
        let Some(outbound) = conn.take_outbound() else {
            return false;
        };
        conn.advance(ConnectionState::Registered);

        self.rooms
            .entry(sub.room_id().to_string())
            .or_default()
            .insert(
                conn.id(),
                Member {
                    conn: Arc::clone(conn),
                    outbound,
                },
            );
        true
    }

    /// Remove one connection, pruning its room if it was the last one.
    pub(crate) fn remove(&mut self, room_id: &str, id: ConnectionId) -> Option<Member> {
        let room = self.rooms.get_mut(room_id)?;
        let member = room.remove(&id);
        if room.is_empty() {
            self.rooms.remove(room_id);
        }
        member
    }

    /// Remove every connection in a room.
    pub(crate) fn remove_room(&mut self, room_id: &str) -> Vec<Member> {
        self.rooms
            .remove(room_id)
            .map(|room| room.into_values().collect())
            .unwrap_or_default()
    }

    /// Remove every connection `user_id` holds in `room_id`.
    pub(crate) fn remove_user(&mut self, room_id: &str, user_id: &str) -> Vec<Member> {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Vec::new();
        };

        let ids: Vec<ConnectionId> = room
            .iter()
            .filter(|(_, member)| member.conn.user_id() == user_id)
            .map(|(id, _)| *id)
            .collect();
        let removed = ids.iter().filter_map(|id| room.remove(id)).collect();

        if room.is_empty() {
            self.rooms.remove(room_id);
        }
        removed
    }

    /// Enqueue `message` for every connection in its room without waiting.
    /// Connections that cannot take it are removed and handed back.
    pub(crate) fn deliver(&mut self, message: &Arc<Message>) -> Delivery {
        let mut delivery = Delivery::default();
        let Some(room) = self.rooms.get_mut(&message.room_id) else {
            return delivery;
        };

        let mut failed = Vec::new();
        for (id, member) in room.iter() {
            match member.outbound.try_send(Arc::clone(message)) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => failed.push((*id, Eviction::Full)),
                Err(TrySendError::Closed(_)) => failed.push((*id, Eviction::Gone)),
            }
        }

        for (id, reason) in failed {
            if let Some(member) = room.remove(&id) {
                delivery.evicted.push((member, reason));
            }
        }
        if room.is_empty() {
            self.rooms.remove(&message.room_id);
        }
        delivery
    }

    /// Remove everything.
    pub(crate) fn drain(&mut self) -> Vec<Member> {
        self.rooms
            .drain()
            .flat_map(|(_, room)| room.into_values())
            .collect()
    }

    pub(crate) fn stats(&self) -> HubStats {
        HubStats {
            rooms: self.rooms.len(),
            connections: self.rooms.values().map(HashMap::len).sum(),
        }
    }

    /// Whether any connection is registered in `room_id`.
    pub(crate) fn has_room(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub(crate) fn members(&self, room_id: &str) -> Vec<RoomMember> {
        let mut members: Vec<RoomMember> = self
            .rooms
            .get(room_id)
            .map(|room| {
                room.values()
                    .map(|member| RoomMember {
                        connection_id: member.conn.id(),
                        user_id: member.conn.user_id().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        members.sort_by_key(|m| m.connection_id);
        members
    }

    #[cfg(test)]
    pub(crate) fn has_empty_rooms(&self) -> bool {
        self.rooms.values().any(HashMap::is_empty)
    }
}
