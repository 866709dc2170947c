//! User queries in Redis.

use crate::client::{RedisError, RedisPool, RedisResult, KEY_PREFIX};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: String,
}

fn user_key(id: &str) -> String {
    format!("{}:user:{}", KEY_PREFIX, id)
}

fn email_key(email: &str) -> String {
    format!("{}:users:email:{}", KEY_PREFIX, email.to_lowercase())
}

/// Insert a user. The email index is claimed first so two concurrent
/// registrations with the same address cannot both succeed.
pub async fn create_user(
    pool: &RedisPool,
    id: &str,
    first_name: &str,
    last_name: &str,
    email: &str,
) -> RedisResult<UserRow> {
    let mut conn = pool.clone();

    let claimed: bool = conn.set_nx(email_key(email), id).await?;
    if !claimed {
        return Err(RedisError::Conflict(format!(
            "Email already registered: {}",
            email
        )));
    }

    let row = UserRow {
        id: id.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_lowercase(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    conn.hset::<_, _, _, ()>(user_key(id), "data", serde_json::to_string(&row)?)
        .await?;
    Ok(row)
}

pub async fn get_user(pool: &RedisPool, id: &str) -> RedisResult<UserRow> {
    let mut conn = pool.clone();
    let json: Option<String> = conn.hget(user_key(id), "data").await?;
    match json {
        Some(j) => Ok(serde_json::from_str(&j)?),
        None => Err(RedisError::NotFound(format!("User not found: {}", id))),
    }
}

pub async fn find_user_by_email(pool: &RedisPool, email: &str) -> RedisResult<UserRow> {
    let mut conn = pool.clone();
    let id: Option<String> = conn.get(email_key(email)).await?;
    match id {
        Some(id) => get_user(pool, &id).await,
        None => Err(RedisError::NotFound(format!("User not found: {}", email))),
    }
}
