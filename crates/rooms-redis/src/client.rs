//! Shared Redis handle and the storage error type.
//!
//! Users, rooms, memberships and message history all live in one Redis
//! database under the `rooms:` key namespace.

use redis::aio::ConnectionManager;
use thiserror::Error;

/// Failures surfaced by the query modules.
#[derive(Error, Debug)]
pub enum RedisError {
    #[error("Redis command failed: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Stored record is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness claim (such as a user's email) is already held.
    #[error("Already exists: {0}")]
    Conflict(String),
}

pub type RedisResult<T> = Result<T, RedisError>;

/// One multiplexed connection shared by the message and room services.
/// Each query clones it for a mutable handle; reconnects happen underneath.
pub type RedisPool = ConnectionManager;

/// Namespace prepended to every key this crate writes.
pub const KEY_PREFIX: &str = "rooms";

fn open_client(redis_url: &str) -> RedisResult<redis::Client> {
    Ok(redis::Client::open(redis_url)?)
}

/// Connect to the server at `redis_url`, e.g. `redis://127.0.0.1:6379`.
pub async fn init_pool(redis_url: &str) -> RedisResult<RedisPool> {
    let manager = ConnectionManager::new(open_client(redis_url)?).await?;
    tracing::debug!(redis_url = %redis_url, "Redis connection manager ready");
    Ok(manager)
}
