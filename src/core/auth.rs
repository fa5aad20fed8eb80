//! Token authentication.
//!
//! Passwords are stored as Argon2 PHC strings. A successful login hands out an
//! opaque 40-character token; each user holds at most one, and logging in again
//! returns the same token until the user logs out.

use crate::{
    entities::{AuthToken, User, auth_token, user},
    errors::{Error, Result},
};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand::{Rng, distributions::Alphanumeric};
use sea_orm::{Set, prelude::*};
use tracing::{debug, info, instrument, warn};

/// Length of the keys handed out by [`login`].
pub const TOKEN_LENGTH: usize = 40;

const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";

/// Hashes `password` with Argon2 and a fresh random salt.
///
/// # Errors
/// Returns [`Error::PasswordHash`] if the hasher rejects its input.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>()).map_err(|e| {
        Error::PasswordHash {
            message: e.to_string(),
        }
    })?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash {
            message: e.to_string(),
        })
}

/// Checks `password` against a stored PHC string. Malformed hashes never verify.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

fn generate_token_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Exchanges an email and password for the user's API token.
///
/// # Errors
/// Returns a validation error on unknown email or wrong password, so callers
/// cannot tell which of the two was wrong.
#[instrument(skip(db, password))]
pub async fn login(db: &DatabaseConnection, email: &str, password: &str) -> Result<String> {
    let Some(account) = User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?
    else {
        warn!("Login attempt for unknown email");
        return Err(Error::validation("non_field_errors", INVALID_CREDENTIALS));
    };

    if !verify_password(password, &account.password_hash) {
        warn!("Wrong password for user {}", account.id);
        return Err(Error::validation("non_field_errors", INVALID_CREDENTIALS));
    }

    if let Some(existing) = AuthToken::find()
        .filter(auth_token::Column::UserId.eq(account.id))
        .one(db)
        .await?
    {
        debug!("Reusing token for user {}", account.id);
        return Ok(existing.key);
    }

    let token = auth_token::ActiveModel {
        key: Set(generate_token_key()),
        user_id: Set(account.id),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await?;
    info!("Issued token for user {}", account.id);
    Ok(token.key)
}

/// Deletes the user's token. Logging out twice is not an error.
#[instrument(skip(db))]
pub async fn logout(db: &DatabaseConnection, user_id: i64) -> Result<()> {
    let result = AuthToken::delete_many()
        .filter(auth_token::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    info!("Logged out user {} ({} tokens removed)", user_id, result.rows_affected);
    Ok(())
}

/// Resolves a token key to its owner.
pub async fn user_for_token(db: &DatabaseConnection, key: &str) -> Result<Option<user::Model>> {
    let found = AuthToken::find_by_id(key.to_string())
        .find_also_related(User)
        .one(db)
        .await?;
    Ok(found.and_then(|(_, owner)| owner))
}
