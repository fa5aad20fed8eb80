//! User business logic - registration, profile lookups, passwords and avatars.

use crate::{
    core::{auth, require_text},
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Select, Set, prelude::*};
use tracing::{info, instrument, warn};

pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_NAME_LENGTH: usize = 150;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Usernames that would shadow a route under `/api/users/`.
pub const RESERVED_USERNAMES: &[&str] = &["me"];

/// Registration payload with the password still in plain text.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Checks length, the reserved list and the allowed character set
/// (letters, digits and `.@+-_`).
///
/// # Errors
/// Returns a validation error on the `username` field.
pub fn validate_username(username: &str) -> Result<()> {
    require_text("username", username, MAX_USERNAME_LENGTH)?;
    if RESERVED_USERNAMES.contains(&username) {
        return Err(Error::validation(
            "username",
            format!("Username '{username}' is reserved."),
        ));
    }
    if let Some(bad) = username
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_')))
    {
        return Err(Error::validation(
            "username",
            format!("Username contains a forbidden character: '{bad}'."),
        ));
    }
    Ok(())
}

/// A deliberately loose shape check: one `@`, something on both sides and a dot
/// in the domain.
pub fn validate_email(email: &str) -> Result<()> {
    require_text("email", email, MAX_EMAIL_LENGTH)?;
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !email.chars().any(char::is_whitespace)
    });
    if valid {
        Ok(())
    } else {
        Err(Error::validation("email", "Enter a valid email address."))
    }
}

/// Creates an account after validating every field and checking that the
/// email and username are free.
///
/// # Errors
/// Returns a validation error naming the offending field, or a database error.
#[instrument(skip(db, new_user), fields(username = %new_user.username))]
pub async fn register(db: &DatabaseConnection, new_user: NewUser) -> Result<user::Model> {
    validate_email(&new_user.email)?;
    validate_username(&new_user.username)?;
    require_text("first_name", &new_user.first_name, MAX_NAME_LENGTH)?;
    require_text("last_name", &new_user.last_name, MAX_NAME_LENGTH)?;
    require_text("password", &new_user.password, MAX_PASSWORD_LENGTH)?;

    if get_user_by_email(db, &new_user.email).await?.is_some() {
        warn!("Email already registered");
        return Err(Error::validation(
            "email",
            "A user with that email already exists.",
        ));
    }
    if User::find()
        .filter(user::Column::Username.eq(new_user.username.as_str()))
        .one(db)
        .await?
        .is_some()
    {
        warn!("Username already taken");
        return Err(Error::validation(
            "username",
            "A user with that username already exists.",
        ));
    }

    let password_hash = auth::hash_password(&new_user.password)?;
    let account = user::ActiveModel {
        username: Set(new_user.username),
        email: Set(new_user.email),
        first_name: Set(new_user.first_name),
        last_name: Set(new_user.last_name),
        avatar: Set(None),
        password_hash: Set(password_hash),
        is_staff: Set(false),
        date_joined: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("Registered user {} (ID: {})", account.username, account.id);
    Ok(account)
}

pub async fn get_user_by_id(db: &DatabaseConnection, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Like [`get_user_by_id`], but a missing user is an error.
pub async fn get_user(db: &DatabaseConnection, user_id: i64) -> Result<user::Model> {
    get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))
}

pub async fn get_user_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
        .map_err(Into::into)
}

/// All users ordered by username, left unexecuted so the caller can paginate.
#[must_use]
pub fn all_users() -> Select<User> {
    User::find().order_by_asc(user::Column::Username)
}

/// Replaces the password after checking the current one.
///
/// # Errors
/// Returns a validation error on `current_password` if it does not match.
#[instrument(skip(db, current_password, new_password))]
pub async fn set_password(
    db: &DatabaseConnection,
    user_id: i64,
    current_password: &str,
    new_password: &str,
) -> Result<()> {
    let account = get_user(db, user_id).await?;
    if !auth::verify_password(current_password, &account.password_hash) {
        warn!("Wrong current password for user {}", user_id);
        return Err(Error::validation("current_password", "Invalid password."));
    }
    require_text("new_password", new_password, MAX_PASSWORD_LENGTH)?;

    let mut active: user::ActiveModel = account.into();
    active.password_hash = Set(auth::hash_password(new_password)?);
    active.update(db).await?;
    info!("Password changed for user {}", user_id);
    Ok(())
}

/// Stores a new avatar path and returns the updated user together with the
/// path it replaced, so the caller can drop the old file.
#[instrument(skip(db))]
pub async fn set_avatar(
    db: &DatabaseConnection,
    user_id: i64,
    avatar_path: String,
) -> Result<(user::Model, Option<String>)> {
    let account = get_user(db, user_id).await?;
    let previous = account.avatar.clone();

    let mut active: user::ActiveModel = account.into();
    active.avatar = Set(Some(avatar_path));
    let updated = active.update(db).await?;
    info!("Avatar updated for user {}", user_id);
    Ok((updated, previous))
}

/// Removes the avatar and returns the path that was cleared.
///
/// # Errors
/// Returns [`Error::NotFound`] if the user has no avatar.
#[instrument(skip(db))]
pub async fn clear_avatar(db: &DatabaseConnection, user_id: i64) -> Result<String> {
    let account = get_user(db, user_id).await?;
    let Some(previous) = account.avatar.clone() else {
        return Err(Error::NotFound {
            resource: "Avatar",
            id: format!("of user {user_id}"),
        });
    };

    let mut active: user::ActiveModel = account.into();
    active.avatar = Set(None);
    active.update(db).await?;
    info!("Avatar removed for user {}", user_id);
    Ok(previous)
}
