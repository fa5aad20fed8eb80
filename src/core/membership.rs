//! Favorites and shopping-cart entries.
//!
//! Both are `(user_id, recipe_id)` join tables with identical add/remove rules,
//! so they share one implementation parameterized by [`RecipeMembership`].

use crate::{
    core::recipe::get_recipe,
    entities::{Favorite, ShoppingCart, favorite, recipe, shopping_cart},
    errors::{Error, Result},
};
use sea_orm::{QuerySelect, Set, SqlErr, prelude::*};
use tracing::{info, instrument, warn};

/// A join table linking users to recipes.
pub trait RecipeMembership: EntityTrait {
    /// Human-readable name used in logs.
    const LABEL: &'static str;
    const ALREADY_PRESENT: &'static str;
    const NOT_PRESENT: &'static str;

    fn user_column() -> Self::Column;
    fn recipe_column() -> Self::Column;
    fn new_row(user_id: i64, recipe_id: i64) -> Self::ActiveModel;
}

impl RecipeMembership for Favorite {
    const LABEL: &'static str = "favorite";
    const ALREADY_PRESENT: &'static str = "Recipe is already in favorites.";
    const NOT_PRESENT: &'static str = "Recipe is not in favorites.";

    fn user_column() -> Self::Column {
        favorite::Column::UserId
    }

    fn recipe_column() -> Self::Column {
        favorite::Column::RecipeId
    }

    fn new_row(user_id: i64, recipe_id: i64) -> Self::ActiveModel {
        favorite::ActiveModel {
            user_id: Set(user_id),
            recipe_id: Set(recipe_id),
            ..Default::default()
        }
    }
}

impl RecipeMembership for ShoppingCart {
    const LABEL: &'static str = "shopping cart";
    const ALREADY_PRESENT: &'static str = "Recipe is already in the shopping cart.";
    const NOT_PRESENT: &'static str = "Recipe is not in the shopping cart.";

    fn user_column() -> Self::Column {
        shopping_cart::Column::UserId
    }

    fn recipe_column() -> Self::Column {
        shopping_cart::Column::RecipeId
    }

    fn new_row(user_id: i64, recipe_id: i64) -> Self::ActiveModel {
        shopping_cart::ActiveModel {
            user_id: Set(user_id),
            recipe_id: Set(recipe_id),
            ..Default::default()
        }
    }
}

/// Whether `user_id` has `recipe_id` in membership `M`.
pub async fn contains<M>(db: &DatabaseConnection, user_id: i64, recipe_id: i64) -> Result<bool>
where
    M: RecipeMembership,
    M::Model: Send + Sync,
{
    let count = M::find()
        .filter(M::user_column().eq(user_id))
        .filter(M::recipe_column().eq(recipe_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Adds a recipe to the user's membership `M` and returns the recipe.
///
/// # Errors
/// - [`Error::NotFound`] if the recipe does not exist
/// - [`Error::AlreadyPresent`] if the pair is already stored, including when a
///   concurrent insert wins the race for the unique index
#[instrument(skip(db), fields(membership = M::LABEL))]
pub async fn add<M>(db: &DatabaseConnection, user_id: i64, recipe_id: i64) -> Result<recipe::Model>
where
    M: RecipeMembership,
    M::Model: Send + Sync,
    M::ActiveModel: ActiveModelTrait<Entity = M> + Send,
{
    let recipe = get_recipe(db, recipe_id).await?;
    if contains::<M>(db, user_id, recipe_id).await? {
        warn!("Recipe {} already in {} of user {}", recipe_id, M::LABEL, user_id);
        return Err(Error::AlreadyPresent {
            message: M::ALREADY_PRESENT.to_string(),
        });
    }

    match M::insert(M::new_row(user_id, recipe_id)).exec(db).await {
        Ok(_) => {
            info!("Added recipe {} to {} of user {}", recipe_id, M::LABEL, user_id);
            Ok(recipe)
        }
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(Error::AlreadyPresent {
                message: M::ALREADY_PRESENT.to_string(),
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Removes a recipe from the user's membership `M`.
///
/// # Errors
/// - [`Error::NotFound`] if the recipe does not exist
/// - [`Error::NotPresent`] if there was nothing to remove
#[instrument(skip(db), fields(membership = M::LABEL))]
pub async fn remove<M>(db: &DatabaseConnection, user_id: i64, recipe_id: i64) -> Result<()>
where
    M: RecipeMembership,
    M::Model: Send + Sync,
{
    get_recipe(db, recipe_id).await?;
    let result = M::delete_many()
        .filter(M::user_column().eq(user_id))
        .filter(M::recipe_column().eq(recipe_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        warn!("Recipe {} not in {} of user {}", recipe_id, M::LABEL, user_id);
        return Err(Error::NotPresent {
            message: M::NOT_PRESENT.to_string(),
        });
    }
    info!("Removed recipe {} from {} of user {}", recipe_id, M::LABEL, user_id);
    Ok(())
}

/// Ids of every recipe the user holds in membership `M`.
pub async fn recipe_ids_for_user<M>(db: &DatabaseConnection, user_id: i64) -> Result<Vec<i64>>
where
    M: RecipeMembership,
{
    M::find()
        .select_only()
        .column(M::recipe_column())
        .filter(M::user_column().eq(user_id))
        .into_tuple::<i64>()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Live number of users holding `recipe_id` in membership `M`.
pub async fn count_for_recipe<M>(db: &DatabaseConnection, recipe_id: i64) -> Result<u64>
where
    M: RecipeMembership,
    M::Model: Send + Sync,
{
    M::find()
        .filter(M::recipe_column().eq(recipe_id))
        .count(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_favorite_twice_is_rejected() -> Result<()> {
        let (db, user, recipe) = setup_with_recipe().await?;

        let added = add::<Favorite>(&db, user.id, recipe.id).await?;
        assert_eq!(added.id, recipe.id);
        assert!(contains::<Favorite>(&db, user.id, recipe.id).await?);

        let again = add::<Favorite>(&db, user.id, recipe.id).await;
        assert!(matches!(again.unwrap_err(), Error::AlreadyPresent { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_absent_then_present() -> Result<()> {
        let (db, user, recipe) = setup_with_recipe().await?;

        let absent = remove::<ShoppingCart>(&db, user.id, recipe.id).await;
        assert!(matches!(absent.unwrap_err(), Error::NotPresent { .. }));

        add::<ShoppingCart>(&db, user.id, recipe.id).await?;
        remove::<ShoppingCart>(&db, user.id, recipe.id).await?;

        let again = remove::<ShoppingCart>(&db, user.id, recipe.id).await;
        assert!(matches!(again.unwrap_err(), Error::NotPresent { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_memberships_are_independent() -> Result<()> {
        let (db, user, recipe) = setup_with_recipe().await?;
        add::<Favorite>(&db, user.id, recipe.id).await?;

        assert!(!contains::<ShoppingCart>(&db, user.id, recipe.id).await?);
        assert_eq!(recipe_ids_for_user::<Favorite>(&db, user.id).await?, vec![recipe.id]);
        assert!(recipe_ids_for_user::<ShoppingCart>(&db, user.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_recipe_is_not_found() -> Result<()> {
        let (db, user, recipe) = setup_with_recipe().await?;
        let result = add::<Favorite>(&db, user.id, recipe.id + 100).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        let result = remove::<Favorite>(&db, user.id, recipe.id + 100).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_favorite_count_is_live() -> Result<()> {
        let (db, user, recipe) = setup_with_recipe().await?;
        let other = create_test_user(&db, "other").await?;

        assert_eq!(count_for_recipe::<Favorite>(&db, recipe.id).await?, 0);
        add::<Favorite>(&db, user.id, recipe.id).await?;
        add::<Favorite>(&db, other.id, recipe.id).await?;
        assert_eq!(count_for_recipe::<Favorite>(&db, recipe.id).await?, 2);

        remove::<Favorite>(&db, user.id, recipe.id).await?;
        assert_eq!(count_for_recipe::<Favorite>(&db, recipe.id).await?, 1);
        Ok(())
    }
}
