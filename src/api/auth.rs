//! Request authentication.
//!
//! Clients authenticate with `Authorization: Token <key>`. Handlers that need a
//! user take [`CurrentUser`]; handlers that merely personalize their output take
//! [`MaybeUser`]. A header carrying an unknown token is rejected by both, the
//! same way a wrong password would be.

use crate::{
    api::AppState,
    core::auth,
    entities::user,
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

/// Scheme prefix of the `Authorization` header.
pub const TOKEN_SCHEME: &str = "Token";

/// The authenticated caller. Rejects the request with 401 if there is none.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

/// The caller, if they sent a token.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<user::Model>);

impl MaybeUser {
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

fn unauthorized(message: &str) -> Error {
    Error::Unauthorized {
        message: message.to_string(),
    }
}

async fn token_user(parts: &Parts, state: &AppState) -> Result<Option<user::Model>> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let key = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix(TOKEN_SCHEME))
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| unauthorized("Invalid token header."))?;

    match auth::user_for_token(&state.db, key).await? {
        Some(found) => Ok(Some(found)),
        None => {
            warn!("Request with unknown token");
            Err(unauthorized("Invalid token."))
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        token_user(parts, state)
            .await?
            .map(Self)
            .ok_or_else(|| unauthorized("Authentication credentials were not provided."))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        token_user(parts, state).await.map(Self)
    }
}
