//! Route handlers.

pub mod hub;
pub mod messages;
pub mod rooms;
pub mod users;

use axum::http::StatusCode;
use rooms_core::RoomsError;
use tracing::error;

/// HTTP status for a domain error.
pub fn status_for(err: &RoomsError) -> StatusCode {
    match err {
        RoomsError::RoomNotFound(_)
        | RoomsError::UserNotFound(_)
        | RoomsError::MessageNotFound(_) => StatusCode::NOT_FOUND,
        RoomsError::NotInRoom { .. } | RoomsError::Forbidden(_) => StatusCode::FORBIDDEN,
        RoomsError::ValidationError(_) => StatusCode::BAD_REQUEST,
        RoomsError::Conflict(_) => StatusCode::CONFLICT,
        RoomsError::Storage(_) | RoomsError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a domain error into a handler rejection.
pub(crate) fn reject(err: RoomsError) -> (StatusCode, String) {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    }
    (status, err.to_string())
}
