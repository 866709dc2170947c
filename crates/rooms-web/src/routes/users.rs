//! User route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rooms_core::{NewUser, User};

use super::reject;
use crate::auth::AuthUser;
use crate::state::AppState;

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), (StatusCode, String)> {
    let user = state.rooms.create_user(&req).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<User>, (StatusCode, String)> {
    let user = state.rooms.get_user(&id).await.map_err(reject)?;
    Ok(Json(user))
}
