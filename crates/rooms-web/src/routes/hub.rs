//! Health and hub introspection.

use axum::{extract::State, http::StatusCode, Json};
use rooms_hub::HubStats;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn stats(
    State(state): State<AppState>,
) -> Result<Json<HubStats>, (StatusCode, String)> {
    let stats = state
        .hub
        .stats()
        .await
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    Ok(Json(stats))
}
