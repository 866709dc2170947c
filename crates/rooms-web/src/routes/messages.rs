//! Message route handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rooms_core::{CreateMessage, Message, MessageQuery, UpdateMessage};

use super::reject;
use crate::auth::AuthUser;
use crate::state::AppState;

pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Vec<Message>>, (StatusCode, String)> {
    let messages = state
        .messages
        .find_by_room(&room_id, user.id(), query)
        .await
        .map_err(reject)?;
    Ok(Json(messages))
}

pub async fn create_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<String>,
    Json(req): Json<CreateMessage>,
) -> Result<(StatusCode, Json<Message>), (StatusCode, String)> {
    let message = state
        .messages
        .create(&room_id, user.id(), &req.text)
        .await
        .map_err(reject)?;

    state.broadcast(message.clone()).await;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn update_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateMessage>,
) -> Result<Json<Message>, (StatusCode, String)> {
    let message = state
        .messages
        .update(&id, user.id(), &req.text)
        .await
        .map_err(reject)?;

    state.broadcast(message.clone()).await;
    Ok(Json(message))
}

pub async fn delete_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Message>, (StatusCode, String)> {
    let message = state
        .messages
        .delete(&id, user.id())
        .await
        .map_err(reject)?;

    state.broadcast(message.clone()).await;
    Ok(Json(message))
}
