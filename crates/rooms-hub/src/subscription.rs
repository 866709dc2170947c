//! Register/unregister requests.

use std::sync::Arc;

use crate::connection::{Connection, ConnectionId};

/// A request to add a connection to, or remove it from, its room.
///
/// Built only from a [`Connection`], so the room and user always match the
/// connection they describe.
#[derive(Debug, Clone)]
pub struct Subscription {
    conn: Arc<Connection>,
    room_id: String,
    user_id: String,
}

impl Subscription {
    pub fn new(conn: &Arc<Connection>) -> Self {
        Self {
            conn: Arc::clone(conn),
            room_id: conn.room_id().to_string(),
            user_id: conn.user_id().to_string(),
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.conn.id()
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}
