//! WebSocket endpoint for live room messages.

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{future, sink::SinkExt, stream::StreamExt};
use rooms_hub::{connection, ClientFrame};
use tracing::{debug, error};

use crate::auth::AuthUser;
use crate::state::AppState;

/// Upgrade to a room connection once the caller is confirmed as a member.
pub async fn ws_handler(
    Path(room_id): Path<String>,
    user: AuthUser,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Err(e) = state.messages.verify_user_in_room(&room_id, user.id()).await {
        if !e.is_client_error() {
            error!(room_id = %room_id, error = %e, "Membership check failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
        debug!(room_id = %room_id, user_id = %user.id(), error = %e, "WebSocket upgrade refused");
        return (StatusCode::FORBIDDEN, e.to_string()).into_response();
    }

    let AuthUser(user_id) = user;
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id, room_id))
}

/// Bridge an upgraded socket to the hub.
async fn handle_socket(socket: WebSocket, state: AppState, user_id: String, room_id: String) {
    let (conn, outbound) = state.hub.open_connection(user_id, room_id);
    let (sender, receiver) = socket.split();

    let sink = sender.with(|frame: String| {
        future::ready(Ok::<_, axum::Error>(WsMessage::Text(frame.into())))
    });
    let stream = receiver.filter_map(|msg| {
        future::ready(match msg {
            Ok(WsMessage::Text(text)) => Some(Ok(ClientFrame::Text(text.as_str().to_owned()))),
            Ok(WsMessage::Close(_)) => Some(Ok(ClientFrame::Close)),
            // Pings are answered by axum; binary frames carry nothing for us.
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
    });

    connection::serve(
        conn,
        outbound,
        state.hub.clone(),
        state.messages.clone(),
        sink,
        stream,
    )
    .await;
}
