//! Administrative facade over the hub.
//!
//! HTTP handlers use this to evict live connections after membership or
//! lifecycle changes made elsewhere (a room deleted, a user removed).

use tracing::{info, warn};

use crate::hub::HubHandle;

#[derive(Debug, Clone)]
pub struct Manager {
    hub: HubHandle,
}

impl Manager {
    pub fn new(hub: HubHandle) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Close every live connection in `room_id`.
    ///
    /// Returns once the request is queued; it is applied after everything the
    /// hub received before it.
    pub async fn disconnect_room(&self, room_id: &str) {
        info!(room_id = %room_id, "Requesting room disconnect");
        if self.hub.disconnect_room(room_id).await.is_err() {
            warn!(room_id = %room_id, "Hub is not running, nothing to disconnect");
        }
    }

    /// Close every live connection `user_id` holds in `room_id`.
    pub async fn disconnect_user_from_room(&self, user_id: &str, room_id: &str) {
        info!(user_id = %user_id, room_id = %room_id, "Requesting user disconnect");
        if self
            .hub
            .disconnect_user_from_room(user_id, room_id)
            .await
            .is_err()
        {
            warn!(
                user_id = %user_id,
                room_id = %room_id,
                "Hub is not running, nothing to disconnect"
            );
        }
    }
}
