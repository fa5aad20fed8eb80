//! Database configuration module for Foodgram.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Composite uniqueness on the join tables
//! cannot be expressed on a single column, so those indexes are created explicitly.

use crate::entities::{
    AuthToken, Favorite, Ingredient, IngredientRecipe, Recipe, RecipeTag, ShoppingCart,
    ShortenedUrl, Subscription, Tag, User, favorite, ingredient_recipe, recipe_tag,
    shopping_cart, subscription,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

/// Default database location when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/foodgram.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates every table and unique index if it does not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    // Parents before children so foreign keys resolve on backends that check them eagerly
    let mut tables = vec![
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(AuthToken),
        schema.create_table_from_entity(Tag),
        schema.create_table_from_entity(Ingredient),
        schema.create_table_from_entity(Recipe),
        schema.create_table_from_entity(RecipeTag),
        schema.create_table_from_entity(IngredientRecipe),
        schema.create_table_from_entity(Favorite),
        schema.create_table_from_entity(ShoppingCart),
        schema.create_table_from_entity(Subscription),
        schema.create_table_from_entity(ShortenedUrl),
    ];
    for table in &mut tables {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    let indexes = [
        unique_pair(
            "uq_recipe_tag",
            RecipeTag,
            recipe_tag::Column::RecipeId,
            recipe_tag::Column::TagId,
        ),
        unique_pair(
            "uq_recipe_ingredient",
            IngredientRecipe,
            ingredient_recipe::Column::RecipeId,
            ingredient_recipe::Column::IngredientId,
        ),
        unique_pair(
            "uq_favorite_user_recipe",
            Favorite,
            favorite::Column::UserId,
            favorite::Column::RecipeId,
        ),
        unique_pair(
            "uq_shopping_cart_user_recipe",
            ShoppingCart,
            shopping_cart::Column::UserId,
            shopping_cart::Column::RecipeId,
        ),
        unique_pair(
            "uq_follower_following",
            Subscription,
            subscription::Column::FollowerId,
            subscription::Column::FollowingId,
        ),
    ];
    for index in &indexes {
        db.execute(builder.build(index)).await?;
    }

    info!("Database tables ensured ({} tables, {} unique indexes).", tables.len(), indexes.len());
    Ok(())
}

fn unique_pair<E: EntityTrait>(
    name: &str,
    entity: E,
    first: E::Column,
    second: E::Column,
) -> IndexCreateStatement {
    Index::create()
        .name(name)
        .table(entity)
        .col(first)
        .col(second)
        .unique()
        .if_not_exists()
        .to_owned()
}
