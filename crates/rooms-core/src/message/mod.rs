//! Chat message persistence.
//!
//! Room membership (`room::verify_user_in_room`) is the only authorization
//! gate for posting and reading; edits and deletions also require authorship.

pub mod model;

use crate::error::{RoomsError, RoomsResult};
use crate::room;
use crate::user::{self, model::User};
use model::{Command, Message, MessageQuery};
use rooms_redis::messages::{self as queries, MessageRow};
use rooms_redis::RedisPool;
use uuid::Uuid;

pub const MAX_TEXT_LEN: usize = 1000;

/// Trim and check message text.
pub fn validate_text(text: &str) -> RoomsResult<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(RoomsError::validation("text is required"));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(RoomsError::validation(format!(
            "text must be at most {} characters",
            MAX_TEXT_LEN
        )));
    }
    Ok(text)
}

async fn insert(
    pool: &RedisPool,
    room_id: &str,
    author: User,
    text: &str,
    command: Command,
    target_id: &str,
) -> RoomsResult<Message> {
    let now = chrono::Utc::now().to_rfc3339();
    let row = MessageRow {
        id: Uuid::new_v4().to_string(),
        room_id: room_id.to_string(),
        user_id: author.id.clone(),
        text: text.to_string(),
        command: command.as_str().to_string(),
        target_id: target_id.to_string(),
        created_at: now.clone(),
        updated_at: now,
    };
    queries::create_message(pool, &row).await?;
    Ok(Message::from_row(row, Some(author)))
}

/// Post a chat message to a room the author belongs to.
pub async fn create_message(
    pool: &RedisPool,
    room_id: &str,
    user_id: &str,
    text: &str,
) -> RoomsResult<Message> {
    tracing::debug!(room_id = %room_id, user_id = %user_id, "Creating message");

    room::verify_user_in_room(pool, room_id, user_id).await?;
    let text = validate_text(text)?;
    let author = user::get_user(pool, user_id).await?;

    insert(pool, room_id, author, text, Command::Create, "").await
}

/// Record a room event (membership change) issued by `user_id` about
/// `target_id`. The caller has already authorized the change itself.
pub async fn create_command(
    pool: &RedisPool,
    room_id: &str,
    user_id: &str,
    command: Command,
    target_id: &str,
) -> RoomsResult<Message> {
    tracing::debug!(
        room_id = %room_id,
        user_id = %user_id,
        command = command.as_str(),
        target_id = %target_id,
        "Recording room event"
    );

    let author = user::get_user(pool, user_id).await?;
    let text = match user::get_user(pool, target_id).await {
        Ok(target) => target.display_name(),
        Err(_) => String::new(),
    };

    insert(pool, room_id, author, &text, command, target_id).await
}

/// Page through a room's history, newest first.
pub async fn find_by_room(
    pool: &RedisPool,
    room_id: &str,
    user_id: &str,
    query: MessageQuery,
) -> RoomsResult<Vec<Message>> {
    room::verify_user_in_room(pool, room_id, user_id).await?;

    let query = query.normalized();
    let offset = query.offset()?;
    let rows = queries::list_room_messages(pool, room_id, offset, query.size).await?;

    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let author = user::get_user(pool, &row.user_id).await.ok();
        messages.push(Message::from_row(row, author));
    }
    Ok(messages)
}

async fn get_own_message(pool: &RedisPool, id: &str, user_id: &str) -> RoomsResult<MessageRow> {
    let row = queries::get_message(pool, id)
        .await
        .map_err(|e| RoomsError::or_not_found(e, || RoomsError::MessageNotFound(id.to_string())))?;

    if row.user_id != user_id {
        return Err(RoomsError::forbidden("you are not the author of this message"));
    }
    Ok(row)
}

/// Edit a message. Returns it labelled as an `Update` event.
pub async fn update_message(
    pool: &RedisPool,
    id: &str,
    user_id: &str,
    text: &str,
) -> RoomsResult<Message> {
    tracing::debug!(msg_id = %id, user_id = %user_id, "Updating message");

    let text = validate_text(text)?;
    get_own_message(pool, id, user_id).await?;

    let row = queries::update_message_text(pool, id, text).await?;
    let author = user::get_user(pool, user_id).await.ok();
    Ok(Message::from_row(row, author).into_event(Command::Update))
}

/// Delete a message. Returns the removed message labelled as a `Delete` event.
pub async fn delete_message(pool: &RedisPool, id: &str, user_id: &str) -> RoomsResult<Message> {
    tracing::debug!(msg_id = %id, user_id = %user_id, "Deleting message");

    let row = get_own_message(pool, id, user_id).await?;
    queries::delete_message(pool, &row).await?;

    let author = user::get_user(pool, user_id).await.ok();
    Ok(Message::from_row(row, author).into_event(Command::Delete))
}
