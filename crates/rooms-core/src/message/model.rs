//! Message domain models.

use crate::error::{RoomsError, RoomsResult};
use crate::user::model::User;
use rooms_redis::messages::MessageRow;
use serde::{Deserialize, Serialize};

/// What a broadcast message represents.
///
/// Membership and edit events ride the same per-room stream as chat text so
/// clients observe them in order with the conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    #[default]
    Create,
    Update,
    Delete,
    AddUser,
    RemoveUser,
}

impl Command {
    /// Parse from string. Unknown values fall back to `Create`.
    pub fn from_str(s: &str) -> Self {
        match s {
            "Update" => Self::Update,
            "Delete" => Self::Delete,
            "AddUser" => Self::AddUser,
            "RemoveUser" => Self::RemoveUser,
            _ => Self::Create,
        }
    }

    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::AddUser => "AddUser",
            Self::RemoveUser => "RemoveUser",
        }
    }
}

/// A chat message, or a room event, as sent to WebSocket clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub user: Option<User>,
    pub text: String,
    pub command: Command,
    pub target_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Message {
    /// Create from database row, attaching the author when known.
    pub fn from_row(row: MessageRow, user: Option<User>) -> Self {
        Self {
            id: row.id,
            room_id: row.room_id,
            user_id: row.user_id,
            user,
            text: row.text,
            command: Command::from_str(&row.command),
            target_id: row.target_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    /// Re-label this message as an event about itself, e.g. an edit or a
    /// deletion notice.
    pub fn into_event(mut self, command: Command) -> Self {
        self.target_id = self.id.clone();
        self.command = command;
        self
    }
}

/// Inbound chat frame and REST body for creating a message.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMessage {
    pub text: String,
}

/// REST body for editing a message.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMessage {
    pub text: String,
}

/// Paging parameters for message history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MessageQuery {
    pub page: usize,
    pub size: usize,
}

impl Default for MessageQuery {
    fn default() -> Self {
        Self { page: 1, size: 20 }
    }
}

impl MessageQuery {
    pub const MAX_SIZE: usize = 100;

    /// Clamp to a usable page: page starts at 1, size within 1..=100.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            size: self.size.clamp(1, Self::MAX_SIZE),
        }
    }

    /// Entries to skip before this page. Pages too far out to address are
    /// rejected rather than wrapped.
    pub fn offset(&self) -> RoomsResult<usize> {
        (self.page.max(1) - 1)
            .checked_mul(self.size)
            .filter(|offset| isize::try_from(*offset).is_ok())
            .ok_or_else(|| RoomsError::validation("page is out of range"))
    }
}
