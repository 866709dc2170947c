//! Collaborator interfaces consumed by the hub and the web layer.
//!
//! The hub never touches storage itself: it asks a [`MessageService`] to
//! authorize and persist, then fans out whatever comes back. Both traits have
//! Redis-backed implementations here; tests substitute in-memory fakes.

use async_trait::async_trait;
use rooms_redis::RedisPool;

use crate::error::RoomsResult;
use crate::message::{
    self,
    model::{Command, Message, MessageQuery},
};
use crate::room::{self, model::Room};
use crate::user::{
    self,
    model::{NewUser, User},
};

/// Authorization and persistence of chat messages.
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Fail unless the user is a member of the room.
    async fn verify_user_in_room(&self, room_id: &str, user_id: &str) -> RoomsResult<()>;

    /// Authorize, persist and enrich a new chat message.
    async fn create(&self, room_id: &str, user_id: &str, text: &str) -> RoomsResult<Message>;

    /// Persist a room event such as a membership change.
    async fn create_command(
        &self,
        room_id: &str,
        user_id: &str,
        command: Command,
        target_id: &str,
    ) -> RoomsResult<Message>;

    async fn find_by_room(
        &self,
        room_id: &str,
        user_id: &str,
        query: MessageQuery,
    ) -> RoomsResult<Vec<Message>>;

    async fn update(&self, id: &str, user_id: &str, text: &str) -> RoomsResult<Message>;

    async fn delete(&self, id: &str, user_id: &str) -> RoomsResult<Message>;
}

/// Users, rooms and durable room membership.
#[async_trait]
pub trait RoomService: Send + Sync {
    async fn create_user(&self, new_user: &NewUser) -> RoomsResult<User>;

    async fn get_user(&self, id: &str) -> RoomsResult<User>;

    async fn create_room(&self, name: &str, owner_id: &str) -> RoomsResult<Room>;

    async fn get_room(&self, id: &str) -> RoomsResult<Room>;

    async fn list_rooms(&self) -> RoomsResult<Vec<Room>>;

    async fn delete_room(&self, id: &str, user_id: &str) -> RoomsResult<()>;

    /// Rename a room; owner only.
    async fn update_room(&self, id: &str, name: &str, user_id: &str) -> RoomsResult<Room>;

    /// Add the user registered under `email`; returns the added user.
    async fn add_user(&self, room_id: &str, email: &str, user_id: &str) -> RoomsResult<User>;

    async fn remove_user(
        &self,
        room_id: &str,
        remove_user_id: &str,
        user_id: &str,
    ) -> RoomsResult<()>;
}

/// [`MessageService`] over Redis.
#[derive(Clone)]
pub struct RedisMessageService {
    pool: RedisPool,
}

impl RedisMessageService {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageService for RedisMessageService {
    async fn verify_user_in_room(&self, room_id: &str, user_id: &str) -> RoomsResult<()> {
        tracing::debug!(room_id = %room_id, user_id = %user_id, "Verifying user in room");
        room::verify_user_in_room(&self.pool, room_id, user_id).await
    }

    async fn create(&self, room_id: &str, user_id: &str, text: &str) -> RoomsResult<Message> {
        message::create_message(&self.pool, room_id, user_id, text).await
    }

    async fn create_command(
        &self,
        room_id: &str,
        user_id: &str,
        command: Command,
        target_id: &str,
    ) -> RoomsResult<Message> {
        message::create_command(&self.pool, room_id, user_id, command, target_id).await
    }

    async fn find_by_room(
        &self,
        room_id: &str,
        user_id: &str,
        query: MessageQuery,
    ) -> RoomsResult<Vec<Message>> {
        message::find_by_room(&self.pool, room_id, user_id, query).await
    }

    async fn update(&self, id: &str, user_id: &str, text: &str) -> RoomsResult<Message> {
        message::update_message(&self.pool, id, user_id, text).await
    }

    async fn delete(&self, id: &str, user_id: &str) -> RoomsResult<Message> {
        message::delete_message(&self.pool, id, user_id).await
    }
}

/// [`RoomService`] over Redis.
#[derive(Clone)]
pub struct RedisRoomService {
    pool: RedisPool,
}

impl RedisRoomService {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomService for RedisRoomService {
    async fn create_user(&self, new_user: &NewUser) -> RoomsResult<User> {
        user::create_user(&self.pool, new_user).await
    }

    async fn get_user(&self, id: &str) -> RoomsResult<User> {
        user::get_user(&self.pool, id).await
    }

    async fn create_room(&self, name: &str, owner_id: &str) -> RoomsResult<Room> {
        room::create_room(&self.pool, name, owner_id).await
    }

    async fn get_room(&self, id: &str) -> RoomsResult<Room> {
        room::get_room(&self.pool, id).await
    }

    async fn list_rooms(&self) -> RoomsResult<Vec<Room>> {
        room::list_rooms(&self.pool).await
    }

    async fn delete_room(&self, id: &str, user_id: &str) -> RoomsResult<()> {
        room::delete_room(&self.pool, id, user_id).await
    }

    async fn update_room(&self, id: &str, name: &str, user_id: &str) -> RoomsResult<Room> {
        room::update_room(&self.pool, id, name, user_id).await
    }

    async fn add_user(&self, room_id: &str, email: &str, user_id: &str) -> RoomsResult<User> {
        room::add_user(&self.pool, room_id, email, user_id).await
    }

    async fn remove_user(
        &self,
        room_id: &str,
        remove_user_id: &str,
        user_id: &str,
    ) -> RoomsResult<()> {
        room::remove_user(&self.pool, room_id, remove_user_id, user_id).await
    }
}
