//! Core business logic - framework-agnostic operations over the entities.
//!
//! Every function takes a `&DatabaseConnection` (or a transaction) and the acting
//! user's id where one is needed. Nothing here knows about HTTP.

/// Token login and password hashing
pub mod auth;
/// Ingredient catalogue lookups
pub mod ingredient;
/// Favorite and shopping-cart memberships
pub mod membership;
/// Recipe creation, update, deletion and listing
pub mod recipe;
/// Shopping-list aggregation over a user's cart
pub mod shopping_list;
/// Lazy short-link allocation
pub mod short_link;
/// Follow / unfollow between users
pub mod subscription;
/// Tag lookups
pub mod tag;
/// Registration, profiles and avatars
pub mod user;

/// Fails with [`crate::errors::Error::Validation`] when `value` is blank or too long.
pub(crate) fn require_text(
    field: &str,
    value: &str,
    max_len: usize,
) -> crate::errors::Result<()> {
    if value.trim().is_empty() {
        return Err(crate::errors::Error::validation(
            field,
            "This field may not be blank.",
        ));
    }
    if value.chars().count() > max_len {
        return Err(crate::errors::Error::validation(
            field,
            format!("Ensure this field has no more than {max_len} characters."),
        ));
    }
    Ok(())
}
