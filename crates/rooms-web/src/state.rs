//! Application state.

use std::sync::Arc;

use rooms_core::{Message, MessageService, RoomService};
use rooms_hub::{HubHandle, Manager};
use tracing::warn;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub messages: Arc<dyn MessageService>,
    pub rooms: Arc<dyn RoomService>,
    pub hub: HubHandle,
    pub manager: Manager,
}

impl AppState {
    pub fn new(
        messages: Arc<dyn MessageService>,
        rooms: Arc<dyn RoomService>,
        hub: HubHandle,
    ) -> Self {
        let manager = Manager::new(hub.clone());
        Self {
            messages,
            rooms,
            hub,
            manager,
        }
    }

    /// Fan a message out to the live connections of its room.
    pub async fn broadcast(&self, message: Message) {
        let room_id = message.room_id.clone();
        let msg_id = message.id.clone();
        if self.hub.broadcast(message).await.is_err() {
            warn!(room_id = %room_id, msg_id = %msg_id, "Hub is not running, message not broadcast");
        }
    }
}
