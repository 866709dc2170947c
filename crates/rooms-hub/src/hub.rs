//! The room broadcast hub.
//!
//! A single task owns the membership registry and processes every request
//! from one FIFO intake, so registrations, unregistrations, broadcasts and
//! administrative evictions are applied strictly in submission order and the
//! registry needs no lock. Delivery to a connection is a non-blocking enqueue;
//! a connection whose queue is full is evicted on the spot.

use std::sync::Arc;

use rooms_core::Message;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::HubConfig;
use crate::connection::{Connection, Outbound};
use crate::registry::{Eviction, HubStats, Member, Registry, RoomMember};
use crate::subscription::Subscription;

/// Hub error types.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubError {
    #[error("Hub is not running")]
    Closed,
}

/// Result type for hub requests.
pub type HubResult<T> = Result<T, HubError>;

#[derive(Debug)]
enum HubCommand {
    Register(Subscription),
    Unregister(Subscription, oneshot::Sender<()>),
    Broadcast(Arc<Message>),
    DisconnectRoom(String),
    DisconnectUser { user_id: String, room_id: String },
    Stats(oneshot::Sender<HubStats>),
    RoomMembers(String, oneshot::Sender<Vec<RoomMember>>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle used to submit requests to a running hub.
#[derive(Debug, Clone)]
pub struct HubHandle {
    intake: mpsc::Sender<HubCommand>,
    queue_capacity: usize,
}

impl HubHandle {
    async fn submit(&self, command: HubCommand) -> HubResult<()> {
        self.intake
            .send(command)
            .await
            .map_err(|_| HubError::Closed)
    }

    async fn ask<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> HubCommand) -> HubResult<T> {
        let (tx, rx) = oneshot::channel();
        self.submit(command(tx)).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Create a connection whose queue uses the hub's configured capacity.
    pub fn open_connection(
        &self,
        user_id: impl Into<String>,
        room_id: impl Into<String>,
    ) -> (Arc<Connection>, Outbound) {
        Connection::new(user_id, room_id, self.queue_capacity)
    }

    /// Add a connection to its room. Registering twice is harmless.
    pub async fn register(&self, sub: Subscription) -> HubResult<()> {
        self.submit(HubCommand::Register(sub)).await
    }

    /// Remove a connection from its room and close its queue. Returns once
    /// the hub has applied the removal. Unregistering a connection that is
    /// not registered does nothing.
    pub async fn unregister(&self, sub: Subscription) -> HubResult<()> {
        self.ask(|tx| HubCommand::Unregister(sub, tx)).await
    }

    /// Fan a message out to every connection in `message.room_id`.
    pub async fn broadcast(&self, message: Message) -> HubResult<()> {
        self.submit(HubCommand::Broadcast(Arc::new(message))).await
    }

    /// Evict every connection in a room.
    pub async fn disconnect_room(&self, room_id: &str) -> HubResult<()> {
        self.submit(HubCommand::DisconnectRoom(room_id.to_string()))
            .await
    }

    /// Evict every connection `user_id` holds in `room_id`.
    pub async fn disconnect_user_from_room(&self, user_id: &str, room_id: &str) -> HubResult<()> {
        self.submit(HubCommand::DisconnectUser {
            user_id: user_id.to_string(),
            room_id: room_id.to_string(),
        })
        .await
    }

    /// Registry counters, as of after every previously submitted request.
    pub async fn stats(&self) -> HubResult<HubStats> {
        self.ask(HubCommand::Stats).await
    }

    /// Live connections in a room, ordered by connection id.
    pub async fn room_members(&self, room_id: &str) -> HubResult<Vec<RoomMember>> {
        let room_id = room_id.to_string();
        self.ask(|tx| HubCommand::RoomMembers(room_id, tx)).await
    }

    /// Close every connection and stop the hub. Returns once the registry
    /// has been emptied.
    pub async fn shutdown(&self) -> HubResult<()> {
        self.ask(HubCommand::Shutdown).await
    }
}

/// The hub event loop and the registry it owns.
pub struct Hub {
    registry: Registry,
    intake: mpsc::Receiver<HubCommand>,
}

impl Hub {
    /// Create a hub and its handle. The hub does nothing until [`Hub::run`].
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.intake_capacity.max(1));
        let hub = Self {
            registry: Registry::default(),
            intake: rx,
        };
        let handle = HubHandle {
            intake: tx,
            queue_capacity: config.queue_capacity.max(1),
        };
        (hub, handle)
    }

    /// Create a hub and run it on the current tokio runtime.
    pub fn spawn(config: HubConfig) -> HubHandle {
        let (hub, handle) = Self::new(config);
        tokio::spawn(hub.run());
        handle
    }

    /// Process requests until shut down or until every handle is dropped.
    pub async fn run(mut self) {
        info!("Starting room hub");

        while let Some(command) = self.intake.recv().await {
            match command {
                HubCommand::Register(sub) => self.register(&sub),
                HubCommand::Unregister(sub, reply) => {
                    self.unregister(&sub);
                    let _ = reply.send(());
                }
                HubCommand::Broadcast(message) => self.broadcast(&message),
                HubCommand::DisconnectRoom(room_id) => self.disconnect_room(&room_id),
                HubCommand::DisconnectUser { user_id, room_id } => {
                    self.disconnect_user(&user_id, &room_id)
                }
                HubCommand::Stats(reply) => {
                    let _ = reply.send(self.registry.stats());
                }
                HubCommand::RoomMembers(room_id, reply) => {
                    let _ = reply.send(self.registry.members(&room_id));
                }
                HubCommand::Shutdown(reply) => {
                    self.intake.close();
                    self.close_all();
                    let _ = reply.send(());
                    break;
                }
            }
        }

        self.close_all();
        info!("Room hub stopped");
    }

    fn register(&mut self, sub: &Subscription) {
        let created_room = !self.registry.has_room(sub.room_id());
        if self.registry.insert(sub) {
            if created_room {
                debug!(room_id = %sub.room_id(), "Creating room connection set");
            }
            debug!(
                connection_id = sub.connection_id(),
                user_id = %sub.user_id(),
                room_id = %sub.room_id(),
                "Registered connection"
            );
        } else {
            debug!(
                connection_id = sub.connection_id(),
                room_id = %sub.room_id(),
                "Connection already registered or closed, ignoring"
            );
        }
    }

    fn unregister(&mut self, sub: &Subscription) {
        match self.registry.remove(sub.room_id(), sub.connection_id()) {
            Some(member) => {
                debug!(
                    connection_id = sub.connection_id(),
                    user_id = %sub.user_id(),
                    room_id = %sub.room_id(),
                    "Unregistered connection"
                );
                member.close();
                self.log_if_room_gone(sub.room_id());
            }
            None => {
                // Never registered (or already gone): still make sure its
                // queue is closed so the write pump can finish.
                sub.connection().release();
            }
        }
    }

    fn broadcast(&mut self, message: &Arc<Message>) {
        let delivery = self.registry.deliver(message);
        debug!(
            room_id = %message.room_id,
            msg_id = %message.id,
            command = message.command.as_str(),
            delivered = delivery.delivered,
            "Broadcast message"
        );

        if delivery.evicted.is_empty() {
            return;
        }
        for (member, reason) in delivery.evicted {
            let conn = member.connection();
            match reason {
                Eviction::Full => warn!(
                    connection_id = conn.id(),
                    user_id = %conn.user_id(),
                    room_id = %conn.room_id(),
                    "Outbound queue full, evicting connection"
                ),
                Eviction::Gone => debug!(
                    connection_id = conn.id(),
                    user_id = %conn.user_id(),
                    room_id = %conn.room_id(),
                    "Write pump gone, evicting connection"
                ),
            }
            member.close();
        }
        self.log_if_room_gone(&message.room_id);
    }

    fn disconnect_room(&mut self, room_id: &str) {
        let members = self.registry.remove_room(room_id);
        info!(room_id = %room_id, connections = members.len(), "Disconnecting room");
        close_members(members);
    }

    fn disconnect_user(&mut self, user_id: &str, room_id: &str) {
        let members = self.registry.remove_user(room_id, user_id);
        info!(
            user_id = %user_id,
            room_id = %room_id,
            connections = members.len(),
            "Disconnecting user from room"
        );
        close_members(members);
        self.log_if_room_gone(room_id);
    }

    fn close_all(&mut self) {
        let members = self.registry.drain();
        if !members.is_empty() {
            info!(connections = members.len(), "Closing all connections");
        }
        close_members(members);
    }

    fn log_if_room_gone(&self, room_id: &str) {
        if !self.registry.has_room(room_id) {
            debug!(room_id = %room_id, "Deleting room connection set");
        }
    }
}

fn close_members(members: Vec<Member>) {
    for member in members {
        member.close();
    }
}
