//! Room and membership route handlers.
//!
//! Membership changes are announced to the room as command messages, and
//! live connections are evicted once the change has been made durable.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rooms_core::{Command, NewRoom, Room, UpdateRoom, User};
use tracing::warn;

use super::reject;
use crate::auth::AuthUser;
use crate::state::AppState;

pub async fn list_rooms(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<Room>>, (StatusCode, String)> {
    let rooms = state.rooms.list_rooms().await.map_err(reject)?;
    Ok(Json(rooms))
}

pub async fn create_room(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewRoom>,
) -> Result<(StatusCode, Json<Room>), (StatusCode, String)> {
    let room = state
        .rooms
        .create_room(&req.name, user.id())
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(room)))
}

pub async fn get_room(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Room>, (StatusCode, String)> {
    let room = state.rooms.get_room(&id).await.map_err(reject)?;
    Ok(Json(room))
}

pub async fn update_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoom>,
) -> Result<Json<Room>, (StatusCode, String)> {
    let room = state
        .rooms
        .update_room(&id, &req.name, user.id())
        .await
        .map_err(reject)?;
    Ok(Json(room))
}

pub async fn delete_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .rooms
        .delete_room(&id, user.id())
        .await
        .map_err(reject)?;

    state.manager.disconnect_room(&id).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, email)): Path<(String, String)>,
) -> Result<(StatusCode, Json<User>), (StatusCode, String)> {
    let added = state
        .rooms
        .add_user(&id, &email, user.id())
        .await
        .map_err(reject)?;

    announce(&state, &id, user.id(), Command::AddUser, &added.id).await;
    Ok((StatusCode::CREATED, Json(added)))
}

pub async fn remove_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, remove_user_id)): Path<(String, String)>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .rooms
        .remove_user(&id, &remove_user_id, user.id())
        .await
        .map_err(reject)?;

    // Announced first so the removed user's connections still receive it.
    announce(&state, &id, user.id(), Command::RemoveUser, &remove_user_id).await;
    state
        .manager
        .disconnect_user_from_room(&remove_user_id, &id)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn announce(state: &AppState, room_id: &str, user_id: &str, command: Command, target_id: &str) {
    match state
        .messages
        .create_command(room_id, user_id, command, target_id)
        .await
    {
        Ok(event) => state.broadcast(event).await,
        Err(e) => warn!(
            room_id = %room_id,
            user_id = %user_id,
            command = command.as_str(),
            error = %e,
            "Failed to record membership event"
        ),
    }
}
