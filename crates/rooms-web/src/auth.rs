//! Caller identity.
//!
//! Authentication happens upstream; requests arrive carrying the user id in
//! the `X-User-Id` header. WebSocket upgrades from browsers cannot set
//! headers, so a `user_id` query parameter is accepted as well.

use axum::{
    extract::{FromRequestParts, Query},
    http::{request::Parts, StatusCode},
};
use serde::Deserialize;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

#[derive(Deserialize)]
struct IdentityQuery {
    user_id: Option<String>,
}

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0
    }

    fn from_parts(parts: &Parts) -> Option<Self> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        header
            .or_else(|| {
                Query::<IdentityQuery>::try_from_uri(&parts.uri)
                    .ok()
                    .and_then(|Query(query)| query.user_id)
                    .filter(|id| !id.trim().is_empty())
            })
            .map(Self)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_parts(parts).ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                "Missing user identity".to_string(),
            )
        })
    }
}
