//! Shared test utilities for Foodgram.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        ingredient,
        recipe::{self, IngredientAmount, RecipeInput},
        tag,
    },
    entities,
    errors::Result,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Placeholder stored by [`create_test_user`]. It is not a valid PHC string,
/// so such users can never log in with a password.
pub const UNUSABLE_PASSWORD_HASH: &str = "!";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Inserts a user directly, skipping password hashing.
///
/// # Defaults
/// * email: `{username}@example.com`
/// * names: "Test" / "User"
/// * `is_staff`: false
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
) -> Result<entities::user::Model> {
    insert_user(db, username, false).await
}

/// Same as [`create_test_user`] but with `is_staff` set.
pub async fn create_test_staff(
    db: &DatabaseConnection,
    username: &str,
) -> Result<entities::user::Model> {
    insert_user(db, username, true).await
}

async fn insert_user(
    db: &DatabaseConnection,
    username: &str,
    is_staff: bool,
) -> Result<entities::user::Model> {
    entities::user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        first_name: Set("Test".to_string()),
        last_name: Set("User".to_string()),
        avatar: Set(None),
        password_hash: Set(UNUSABLE_PASSWORD_HASH.to_string()),
        is_staff: Set(is_staff),
        date_joined: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

pub async fn create_test_tag(
    db: &DatabaseConnection,
    name: &str,
    slug: &str,
) -> Result<entities::tag::Model> {
    tag::create_tag(db, name.to_string(), slug.to_string()).await
}

pub async fn create_test_ingredient(
    db: &DatabaseConnection,
    name: &str,
    measurement_unit: &str,
) -> Result<entities::ingredient::Model> {
    ingredient::create_ingredient(db, name.to_string(), measurement_unit.to_string()).await
}

/// Creates a recipe through the normal write path.
///
/// # Defaults
/// * one ingredient: 100 g of "test flour" (shared between calls)
/// * one tag: slug "test" (shared between calls)
/// * `cooking_time`: 10
pub async fn create_test_recipe(
    db: &DatabaseConnection,
    author_id: i64,
    name: &str,
) -> Result<entities::recipe::Model> {
    let flour = match ingredient::find_ingredient(db, "test flour", "g").await? {
        Some(existing) => existing,
        None => create_test_ingredient(db, "test flour", "g").await?,
    };
    let test_tag = match tag::get_tag_by_slug(db, "test").await? {
        Some(existing) => existing,
        None => create_test_tag(db, "Test", "test").await?,
    };

    recipe::create_recipe(
        db,
        author_id,
        RecipeInput {
            name: name.to_string(),
            text: format!("How to make {name}."),
            cooking_time: 10,
            image: "recipes/test.png".to_string(),
            ingredients: vec![IngredientAmount {
                id: flour.id,
                amount: 100,
            }],
            tags: vec![test_tag.id],
        },
    )
    .await
}

/// Sets up a database with one user who authored one recipe.
pub async fn setup_with_recipe() -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::recipe::Model,
)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "author").await?;
    let recipe = create_test_recipe(&db, user.id, "Test Recipe").await?;
    Ok((db, user, recipe))
}
