//! Centralized error types for Rooms.

use rooms_redis::RedisError;
use thiserror::Error;

/// Main error type for Rooms operations.
#[derive(Error, Debug)]
pub enum RoomsError {
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("User '{user_id}' is not in room '{room_id}'")]
    NotInRoom { room_id: String, user_id: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for Rooms operations.
pub type RoomsResult<T> = Result<T, RoomsError>;

impl RoomsError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a forbidden error.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create a not-in-room error.
    pub fn not_in_room(room_id: &str, user_id: &str) -> Self {
        Self::NotInRoom {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
        }
    }

    /// Map a storage `NotFound` into a domain-specific variant, passing any
    /// other storage failure through unchanged.
    pub fn or_not_found(err: RedisError, not_found: impl FnOnce() -> RoomsError) -> Self {
        match err {
            RedisError::NotFound(_) => not_found(),
            other => Self::Storage(other),
        }
    }

    /// True for the errors a caller could fix by changing the request
    /// (as opposed to storage failures).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Json(_))
    }
}
