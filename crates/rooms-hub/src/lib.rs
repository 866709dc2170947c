//! Rooms Hub
//!
//! Live fan-out of room messages to WebSocket connections. One hub task owns
//! room membership; every connection has a bounded outbound queue and a pair
//! of pumps bridging it to the transport.

pub mod config;
pub mod connection;
pub mod hub;
pub mod manager;
pub mod registry;
pub mod subscription;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::HubConfig;
pub use connection::{serve, ClientFrame, Connection, ConnectionId, ConnectionState, Outbound};
pub use hub::{Hub, HubError, HubHandle, HubResult};
pub use manager::Manager;
pub use registry::{HubStats, RoomMember};
pub use subscription::Subscription;
