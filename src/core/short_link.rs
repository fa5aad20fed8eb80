//! Short links - lazily allocated codes that redirect to a recipe's page.
//!
//! A code is drawn at random, checked and inserted inside one transaction.
//! Collisions are retried a bounded number of times and exhaustion is an error
//! rather than an endless loop.

use crate::{
    core::recipe::get_recipe,
    entities::{ShortenedUrl, shortened_url},
    errors::{Error, Result},
};
use rand::{Rng, distributions::Alphanumeric};
use sea_orm::{ConnectionTrait, Set, SqlErr, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument, warn};

/// Length of every generated code.
pub const CODE_LENGTH: usize = 6;
/// How many codes are tried before giving up.
pub const MAX_ATTEMPTS: u32 = 16;

/// Draws a code from `[A-Za-z0-9]`.
#[must_use]
pub fn random_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

async fn find_for_recipe<C: ConnectionTrait>(
    db: &C,
    recipe_id: i64,
) -> Result<Option<shortened_url::Model>> {
    ShortenedUrl::find()
        .filter(shortened_url::Column::RecipeId.eq(recipe_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the short link of a recipe, creating it on first request.
///
/// `original_url` is only stored when a new link is created.
pub async fn get_or_create_short_link(
    db: &DatabaseConnection,
    recipe_id: i64,
    original_url: &str,
) -> Result<shortened_url::Model> {
    get_or_create_with(db, recipe_id, original_url, random_code).await
}

/// [`get_or_create_short_link`] with an explicit code source.
///
/// # Errors
/// - [`Error::NotFound`] if the recipe does not exist
/// - [`Error::ShortLinkExhausted`] after [`MAX_ATTEMPTS`] colliding codes
#[instrument(skip(db, next_code))]
pub async fn get_or_create_with<F>(
    db: &DatabaseConnection,
    recipe_id: i64,
    original_url: &str,
    mut next_code: F,
) -> Result<shortened_url::Model>
where
    F: FnMut() -> String + Send,
{
    if let Some(existing) = find_for_recipe(db, recipe_id).await? {
        debug!("Recipe {} already has code {}", recipe_id, existing.short_url);
        return Ok(existing);
    }
    get_recipe(db, recipe_id).await?;

    let txn = db.begin().await?;
    for attempt in 1..=MAX_ATTEMPTS {
        let code = next_code();
        let taken = ShortenedUrl::find()
            .filter(shortened_url::Column::ShortUrl.eq(code.as_str()))
            .count(&txn)
            .await?
            > 0;
        if taken {
            debug!("Code {} taken on attempt {}", code, attempt);
            continue;
        }

        let row = shortened_url::ActiveModel {
            original_url: Set(original_url.to_string()),
            short_url: Set(code.clone()),
            recipe_id: Set(recipe_id),
            ..Default::default()
        };
        // Savepoint, so a failed insert leaves the outer transaction usable
        let savepoint = txn.begin().await?;
        match row.insert(&savepoint).await {
            Ok(link) => {
                savepoint.commit().await?;
                txn.commit().await?;
                info!("Created short link {} for recipe {}", link.short_url, recipe_id);
                return Ok(link);
            }
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                savepoint.rollback().await?;
                if let Some(winner) = find_for_recipe(&txn, recipe_id).await? {
                    txn.commit().await?;
                    debug!("Lost the race for recipe {}, returning existing link", recipe_id);
                    return Ok(winner);
                }
            }
            Err(err) => return Err(err.into()),
        }
    }

    txn.rollback().await?;
    warn!("No free short code for recipe {} after {} attempts", recipe_id, MAX_ATTEMPTS);
    Err(Error::ShortLinkExhausted {
        attempts: MAX_ATTEMPTS,
    })
}

/// Looks up the link stored under `code`.
///
/// # Errors
/// Returns [`Error::NotFound`] for unknown codes.
pub async fn resolve_code(db: &DatabaseConnection, code: &str) -> Result<shortened_url::Model> {
    ShortenedUrl::find()
        .filter(shortened_url::Column::ShortUrl.eq(code))
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Short link",
            id: code.to_string(),
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_random_code_shape() {
        let code = random_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn test_same_code_on_repeat() -> Result<()> {
        let (db, _, recipe) = setup_with_recipe().await?;
        let url = format!("http://localhost:8000/api/recipes/{}/", recipe.id);

        let first = get_or_create_short_link(&db, recipe.id, &url).await?;
        let second = get_or_create_short_link(&db, recipe.id, &url).await?;
        assert_eq!(first.short_url, second.short_url);
        assert_eq!(first.original_url, url);

        let resolved = resolve_code(&db, &first.short_url).await?;
        assert_eq!(resolved.recipe_id, recipe.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_collision_draws_again() -> Result<()> {
        let (db, user, first) = setup_with_recipe().await?;
        let second = create_test_recipe(&db, user.id, "Second").await?;

        get_or_create_with(&db, first.id, "http://x/1/", || "AAAAAA".to_string()).await?;

        let mut codes = vec!["BBBBBB", "AAAAAA"];
        let link = get_or_create_with(&db, second.id, "http://x/2/", || {
            codes.pop().unwrap().to_string()
        })
        .await?;
        assert_eq!(link.short_url, "BBBBBB");
        Ok(())
    }

    #[tokio::test]
    async fn test_exhaustion_is_an_error() -> Result<()> {
        let (db, user, first) = setup_with_recipe().await?;
        let second = create_test_recipe(&db, user.id, "Second").await?;
        get_or_create_with(&db, first.id, "http://x/1/", || "AAAAAA".to_string()).await?;

        let mut calls = 0;
        let result = get_or_create_with(&db, second.id, "http://x/2/", || {
            calls += 1;
            "AAAAAA".to_string()
        })
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ShortLinkExhausted { attempts } if attempts == MAX_ATTEMPTS
        ));
        assert_eq!(calls, MAX_ATTEMPTS);
        assert!(find_for_recipe(&db, second.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_code_and_recipe() -> Result<()> {
        let (db, _, recipe) = setup_with_recipe().await?;
        assert!(matches!(
            resolve_code(&db, "nope00").await.unwrap_err(),
            Error::NotFound { .. }
        ));
        assert!(matches!(
            get_or_create_short_link(&db, recipe.id + 1, "http://x/").await.unwrap_err(),
            Error::NotFound { .. }
        ));
        Ok(())
    }
}
