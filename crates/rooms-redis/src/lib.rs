//! Rooms Redis Data Layer
//!
//! Async Redis-based persistence for users, rooms and chat messages.
//! Live connection membership is never stored here; it belongs to the hub.

pub mod client;
pub mod queries;

pub use client::{init_pool, RedisError, RedisPool, RedisResult, KEY_PREFIX};
pub use queries::messages;
pub use queries::rooms;
pub use queries::users;
