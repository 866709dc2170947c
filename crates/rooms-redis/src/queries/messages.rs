//! Chat message queries in Redis.

use crate::client::{RedisError, RedisPool, RedisResult, KEY_PREFIX};
use crate::queries::rooms::room_messages_key;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub text: String,
    pub command: String,
    pub target_id: String,
    pub created_at: String,
    pub updated_at: String,
}

pub(crate) fn message_key(id: &str) -> String {
    format!("{}:message:{}", KEY_PREFIX, id)
}

/// Insert a new message and index it in its room's timeline.
pub async fn create_message(pool: &RedisPool, row: &MessageRow) -> RedisResult<()> {
    let mut conn = pool.clone();
    conn.hset::<_, _, _, ()>(message_key(&row.id), "data", serde_json::to_string(row)?)
        .await?;

    let score = chrono::DateTime::parse_from_rfc3339(&row.created_at)
        .map(|t| t.timestamp_millis())
        .unwrap_or_else(|_| chrono::Utc::now().timestamp_millis());
    conn.zadd::<_, _, _, ()>(room_messages_key(&row.room_id), &row.id, score)
        .await?;
    Ok(())
}

pub async fn get_message(pool: &RedisPool, id: &str) -> RedisResult<MessageRow> {
    let mut conn = pool.clone();
    let json: Option<String> = conn.hget(message_key(id), "data").await?;
    match json {
        Some(j) => Ok(serde_json::from_str(&j)?),
        None => Err(RedisError::NotFound(format!("Message not found: {}", id))),
    }
}

/// Replace the text of an existing message.
pub async fn update_message_text(
    pool: &RedisPool,
    id: &str,
    text: &str,
) -> RedisResult<MessageRow> {
    let mut row = get_message(pool, id).await?;
    row.text = text.to_string();
    row.updated_at = chrono::Utc::now().to_rfc3339();

    let mut conn = pool.clone();
    conn.hset::<_, _, _, ()>(message_key(id), "data", serde_json::to_string(&row)?)
        .await?;
    Ok(row)
}

pub async fn delete_message(pool: &RedisPool, row: &MessageRow) -> RedisResult<()> {
    let mut conn = pool.clone();
    conn.del::<_, ()>(message_key(&row.id)).await?;
    conn.zrem::<_, _, ()>(room_messages_key(&row.room_id), &row.id)
        .await?;
    Ok(())
}

/// Inclusive `ZREVRANGE` bounds for a page. `None` when the page is empty or
/// starts past any rank Redis can address.
fn rank_range(offset: usize, limit: usize) -> Option<(isize, isize)> {
    if limit == 0 {
        return None;
    }
    let start = isize::try_from(offset).ok()?;
    let span = isize::try_from(limit - 1).unwrap_or(isize::MAX);
    Some((start, start.saturating_add(span)))
}

/// List a room's messages newest first, skipping `offset` entries.
pub async fn list_room_messages(
    pool: &RedisPool,
    room_id: &str,
    offset: usize,
    limit: usize,
) -> RedisResult<Vec<MessageRow>> {
    let Some((start, stop)) = rank_range(offset, limit) else {
        return Ok(Vec::new());
    };

    let mut conn = pool.clone();
    let ids: Vec<String> = conn.zrevrange(room_messages_key(room_id), start, stop).await?;

    let mut messages = Vec::with_capacity(ids.len());
    for id in ids {
        match get_message(pool, &id).await {
            Ok(row) => messages.push(row),
            Err(RedisError::NotFound(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(messages)
}
