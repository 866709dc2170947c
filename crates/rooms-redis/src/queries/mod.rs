//! Query modules for all Rooms entities stored in Redis.

pub mod messages;
pub mod rooms;
pub mod users;
