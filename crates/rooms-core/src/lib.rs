//! Rooms Core Library
//!
//! Domain models and business logic for chat rooms: users, rooms, messages,
//! and the collaborator services the broadcast hub relies on.

pub mod error;
pub mod message;
pub mod room;
pub mod service;
pub mod user;

pub use error::{RoomsError, RoomsResult};
pub use message::model::{Command, CreateMessage, Message, MessageQuery, UpdateMessage};
pub use room::model::{NewRoom, Room, UpdateRoom};
pub use service::{MessageService, RedisMessageService, RedisRoomService, RoomService};
pub use user::model::{NewUser, User};
