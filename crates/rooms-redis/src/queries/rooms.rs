//! Room and room membership queries in Redis.
//!
//! Membership here is the durable "who may join" list. It is unrelated to the
//! live connection registry kept in memory by the hub.

use crate::client::{RedisError, RedisPool, RedisResult, KEY_PREFIX};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRow {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: String,
}

fn room_key(id: &str) -> String {
    format!("{}:room:{}", KEY_PREFIX, id)
}

fn members_key(id: &str) -> String {
    format!("{}:room:{}:members", KEY_PREFIX, id)
}

fn all_rooms_key() -> String {
    format!("{}:rooms:all", KEY_PREFIX)
}

pub(crate) fn room_messages_key(id: &str) -> String {
    format!("{}:room:{}:messages", KEY_PREFIX, id)
}

/// Create a room and add its owner as the first member.
pub async fn create_room(
    pool: &RedisPool,
    id: &str,
    name: &str,
    owner_id: &str,
) -> RedisResult<RoomRow> {
    let now = chrono::Utc::now();
    let row = RoomRow {
        id: id.to_string(),
        name: name.to_string(),
        owner_id: owner_id.to_string(),
        created_at: now.to_rfc3339(),
    };

    let mut conn = pool.clone();
    conn.hset::<_, _, _, ()>(room_key(id), "data", serde_json::to_string(&row)?)
        .await?;
    conn.zadd::<_, _, _, ()>(all_rooms_key(), id, now.timestamp_millis())
        .await?;
    conn.sadd::<_, _, ()>(members_key(id), owner_id).await?;
    Ok(row)
}

pub async fn get_room(pool: &RedisPool, id: &str) -> RedisResult<RoomRow> {
    let mut conn = pool.clone();
    let json: Option<String> = conn.hget(room_key(id), "data").await?;
    match json {
        Some(j) => Ok(serde_json::from_str(&j)?),
        None => Err(RedisError::NotFound(format!("Room not found: {}", id))),
    }
}

/// Rename a room, keeping its id, owner and creation time.
pub async fn update_room_name(pool: &RedisPool, id: &str, name: &str) -> RedisResult<RoomRow> {
    let mut row = get_room(pool, id).await?;
    row.name = name.to_string();

    let mut conn = pool.clone();
    conn.hset::<_, _, _, ()>(room_key(id), "data", serde_json::to_string(&row)?)
        .await?;
    Ok(row)
}

pub async fn list_rooms(pool: &RedisPool) -> RedisResult<Vec<RoomRow>> {
    let mut conn = pool.clone();
    let ids: Vec<String> = conn.zrange(all_rooms_key(), 0, -1).await?;
    let mut rooms = Vec::new();
    for id in ids {
        let mut c = pool.clone();
        let json: Option<String> = c.hget(room_key(&id), "data").await?;
        if let Some(j) = json {
            if let Ok(row) = serde_json::from_str::<RoomRow>(&j) {
                rooms.push(row);
            }
        }
    }
    Ok(rooms)
}

/// Delete a room together with its membership list and message history.
pub async fn delete_room(pool: &RedisPool, id: &str) -> RedisResult<()> {
    let mut conn = pool.clone();

    let message_ids: Vec<String> = conn.zrange(room_messages_key(id), 0, -1).await?;
    for message_id in &message_ids {
        conn.del::<_, ()>(crate::queries::messages::message_key(message_id))
            .await?;
    }

    conn.del::<_, ()>(room_messages_key(id)).await?;
    conn.del::<_, ()>(members_key(id)).await?;
    conn.del::<_, ()>(room_key(id)).await?;
    conn.zrem::<_, _, ()>(all_rooms_key(), id).await?;

    tracing::debug!(room_id = %id, messages = message_ids.len(), "Room deleted");
    Ok(())
}

pub async fn add_member(pool: &RedisPool, room_id: &str, user_id: &str) -> RedisResult<()> {
    let mut conn = pool.clone();
    conn.sadd::<_, _, ()>(members_key(room_id), user_id).await?;
    Ok(())
}

pub async fn remove_member(pool: &RedisPool, room_id: &str, user_id: &str) -> RedisResult<()> {
    let mut conn = pool.clone();
    conn.srem::<_, _, ()>(members_key(room_id), user_id).await?;
    Ok(())
}

pub async fn is_member(pool: &RedisPool, room_id: &str, user_id: &str) -> RedisResult<bool> {
    let mut conn = pool.clone();
    let member: bool = conn.sismember(members_key(room_id), user_id).await?;
    Ok(member)
}

pub async fn list_members(pool: &RedisPool, room_id: &str) -> RedisResult<Vec<String>> {
    let mut conn = pool.clone();
    let mut ids: Vec<String> = conn.smembers(members_key(room_id)).await?;
    ids.sort();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_namespaced_per_room() {
        assert_eq!(room_key("r1"), "rooms:room:r1");
        assert_eq!(members_key("r1"), "rooms:room:r1:members");
        assert_eq!(room_messages_key("r1"), "rooms:room:r1:messages");
        assert_eq!(all_rooms_key(), "rooms:rooms:all");
    }
}
