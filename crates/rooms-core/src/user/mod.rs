//! User registration and lookup.

pub mod model;

use crate::error::{RoomsError, RoomsResult};
use model::{NewUser, User};
use rooms_redis::users as queries;
use rooms_redis::{RedisError, RedisPool};
use uuid::Uuid;

const MAX_NAME_LEN: usize = 64;

/// Check a registration payload before anything touches storage.
pub fn validate_new_user(new_user: &NewUser) -> RoomsResult<()> {
    for (field, value) in [
        ("firstName", &new_user.first_name),
        ("lastName", &new_user.last_name),
    ] {
        let value = value.trim();
        if value.is_empty() {
            return Err(RoomsError::validation(format!("{} is required", field)));
        }
        if value.chars().count() > MAX_NAME_LEN {
            return Err(RoomsError::validation(format!(
                "{} must be at most {} characters",
                field, MAX_NAME_LEN
            )));
        }
    }

    let email = new_user.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(RoomsError::validation("email is not valid")),
    }
}

/// Register a new user.
pub async fn create_user(pool: &RedisPool, new_user: &NewUser) -> RoomsResult<User> {
    validate_new_user(new_user)?;

    let id = Uuid::new_v4().to_string();
    let row = queries::create_user(
        pool,
        &id,
        new_user.first_name.trim(),
        new_user.last_name.trim(),
        new_user.email.trim(),
    )
    .await
    .map_err(|e| match e {
        RedisError::Conflict(msg) => RoomsError::Conflict(msg),
        other => RoomsError::Storage(other),
    })?;

    tracing::debug!(user_id = %row.id, "User created");
    Ok(User::from_row(row))
}

/// Get a user by ID.
pub async fn get_user(pool: &RedisPool, id: &str) -> RoomsResult<User> {
    let row = queries::get_user(pool, id)
        .await
        .map_err(|e| RoomsError::or_not_found(e, || RoomsError::UserNotFound(id.to_string())))?;
    Ok(User::from_row(row))
}

/// Find a user by email address (case-insensitive).
pub async fn find_user_by_email(pool: &RedisPool, email: &str) -> RoomsResult<User> {
    let row = queries::find_user_by_email(pool, email.trim())
        .await
        .map_err(|e| RoomsError::or_not_found(e, || RoomsError::UserNotFound(email.to_string())))?;
    Ok(User::from_row(row))
}
