//! Rooms and their durable membership lists.
//!
//! Every mutation here is authorized against the calling user. Callers that
//! need live connections dropped afterwards go through the hub manager.

pub mod model;

use crate::error::{RoomsError, RoomsResult};
use crate::user::{self, model::User};
use model::Room;
use rooms_redis::rooms as queries;
use rooms_redis::RedisPool;
use uuid::Uuid;

const MAX_ROOM_NAME_LEN: usize = 64;

/// Check a room name before it is stored.
pub fn validate_room_name(name: &str) -> RoomsResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RoomsError::validation("name is required"));
    }
    if name.chars().count() > MAX_ROOM_NAME_LEN {
        return Err(RoomsError::validation(format!(
            "name must be at most {} characters",
            MAX_ROOM_NAME_LEN
        )));
    }
    Ok(())
}

/// Decide whether `actor_id` may remove `target_id` from `room`.
///
/// The owner may remove anyone but themselves; members may only leave.
pub fn can_remove_user(room: &Room, target_id: &str, actor_id: &str) -> RoomsResult<()> {
    if room.is_owner(target_id) {
        return Err(RoomsError::forbidden(
            "the room owner cannot be removed, delete the room instead",
        ));
    }
    if room.is_owner(actor_id) || target_id == actor_id {
        return Ok(());
    }
    Err(RoomsError::forbidden(
        "only the room owner can remove other users",
    ))
}

/// Only the owner may change a room's settings.
pub fn can_update_room(room: &Room, actor_id: &str) -> RoomsResult<()> {
    if room.is_owner(actor_id) {
        Ok(())
    } else {
        Err(RoomsError::forbidden("only the room owner can change it"))
    }
}

/// Create a room owned by `owner_id`.
pub async fn create_room(pool: &RedisPool, name: &str, owner_id: &str) -> RoomsResult<Room> {
    validate_room_name(name)?;
    user::get_user(pool, owner_id).await?;

    let id = Uuid::new_v4().to_string();
    let row = queries::create_room(pool, &id, name.trim(), owner_id).await?;

    tracing::debug!(room_id = %id, owner_id = %owner_id, "Room created");
    Ok(Room::from_row(row, vec![owner_id.to_string()]))
}

/// Get a room by ID, including its members.
pub async fn get_room(pool: &RedisPool, id: &str) -> RoomsResult<Room> {
    let row = queries::get_room(pool, id)
        .await
        .map_err(|e| RoomsError::or_not_found(e, || RoomsError::RoomNotFound(id.to_string())))?;
    let members = queries::list_members(pool, id).await?;
    Ok(Room::from_row(row, members))
}

/// List all rooms, oldest first.
pub async fn list_rooms(pool: &RedisPool) -> RoomsResult<Vec<Room>> {
    let rows = queries::list_rooms(pool).await?;
    let mut rooms = Vec::with_capacity(rows.len());
    for row in rows {
        let members = queries::list_members(pool, &row.id).await?;
        rooms.push(Room::from_row(row, members));
    }
    Ok(rooms)
}

/// Rename a room. Only its owner may do this.
pub async fn update_room(
    pool: &RedisPool,
    id: &str,
    name: &str,
    user_id: &str,
) -> RoomsResult<Room> {
    validate_room_name(name)?;
    let room = get_room(pool, id).await?;
    can_update_room(&room, user_id)?;

    let row = queries::update_room_name(pool, id, name.trim()).await?;
    tracing::debug!(room_id = %id, "Room renamed");
    Ok(Room::from_row(row, room.user_ids))
}

/// Delete a room. Only its owner may do this.
pub async fn delete_room(pool: &RedisPool, id: &str, user_id: &str) -> RoomsResult<()> {
    let room = get_room(pool, id).await?;
    if !room.is_owner(user_id) {
        return Err(RoomsError::forbidden("only the room owner can delete it"));
    }
    queries::delete_room(pool, id).await?;
    Ok(())
}

/// Add the user registered under `email` to a room the caller belongs to.
///
/// Adding someone who is already a member is accepted and changes nothing.
pub async fn add_user(
    pool: &RedisPool,
    room_id: &str,
    email: &str,
    user_id: &str,
) -> RoomsResult<User> {
    let room = get_room(pool, room_id).await?;
    if !room.has_user(user_id) {
        return Err(RoomsError::not_in_room(room_id, user_id));
    }

    let target = user::find_user_by_email(pool, email).await?;
    queries::add_member(pool, room_id, &target.id).await?;

    tracing::debug!(room_id = %room_id, user_id = %target.id, "User added to room");
    Ok(target)
}

/// Remove `remove_user_id` from a room on behalf of `user_id`.
pub async fn remove_user(
    pool: &RedisPool,
    room_id: &str,
    remove_user_id: &str,
    user_id: &str,
) -> RoomsResult<()> {
    let room = get_room(pool, room_id).await?;
    if !room.has_user(remove_user_id) {
        return Err(RoomsError::not_in_room(room_id, remove_user_id));
    }
    can_remove_user(&room, remove_user_id, user_id)?;

    queries::remove_member(pool, room_id, remove_user_id).await?;

    tracing::debug!(room_id = %room_id, user_id = %remove_user_id, "User removed from room");
    Ok(())
}

/// Fail unless `user_id` is a member of `room_id`.
pub async fn verify_user_in_room(pool: &RedisPool, room_id: &str, user_id: &str) -> RoomsResult<()> {
    queries::get_room(pool, room_id)
        .await
        .map_err(|e| RoomsError::or_not_found(e, || RoomsError::RoomNotFound(room_id.to_string())))?;

    if queries::is_member(pool, room_id, user_id).await? {
        Ok(())
    } else {
        Err(RoomsError::not_in_room(room_id, user_id))
    }
}
