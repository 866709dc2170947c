//! Room domain models.

use rooms_redis::rooms::RoomRow;
use serde::{Deserialize, Serialize};

/// A chat room and the users allowed to join it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub user_ids: Vec<String>,
    pub created_at: String,
}

impl Room {
    /// Create from database row plus its membership list.
    pub fn from_row(row: RoomRow, user_ids: Vec<String>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            owner_id: row.owner_id,
            user_ids,
            created_at: row.created_at,
        }
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    pub fn has_user(&self, user_id: &str) -> bool {
        self.user_ids.iter().any(|id| id == user_id)
    }
}

/// Room creation payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRoom {
    pub name: String,
}

/// Room rename payload.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoom {
    pub name: String,
}
