//! Ingredient business logic.
//!
//! The catalogue is read-only through the API and is searched by name prefix.

use crate::{
    core::require_text,
    entities::{Ingredient, ingredient},
    errors::Result,
};
use sea_orm::{
    QueryOrder, Set,
    prelude::*,
    sea_query::{Expr, LikeExpr},
};
use tracing::{debug, info, instrument};

/// Maximum length of an ingredient name.
pub const MAX_INGREDIENT_NAME_LENGTH: usize = 128;
/// Maximum length of a measurement unit.
pub const MAX_UNIT_LENGTH: usize = 64;

/// Lists ingredients ordered by name, optionally restricted to a name prefix.
///
/// The prefix match is a SQL `LIKE 'prefix%'`, which `SQLite` evaluates
/// case-insensitively for ASCII letters. `%` and `_` in the prefix match
/// themselves.
pub async fn search_ingredients(
    db: &DatabaseConnection,
    name_prefix: Option<&str>,
) -> Result<Vec<ingredient::Model>> {
    let mut query = Ingredient::find();
    if let Some(prefix) = name_prefix.filter(|p| !p.is_empty()) {
        let pattern = LikeExpr::new(format!("{}%", escape_like(prefix))).escape('\\');
        query = query.filter(Expr::col((Ingredient, ingredient::Column::Name)).like(pattern));
    }
    let ingredients = query
        .order_by_asc(ingredient::Column::Name)
        .all(db)
        .await?;
    debug!("Ingredient search {:?} matched {}", name_prefix, ingredients.len());
    Ok(ingredients)
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub async fn get_ingredient_by_id(
    db: &DatabaseConnection,
    ingredient_id: i64,
) -> Result<Option<ingredient::Model>> {
    Ingredient::find_by_id(ingredient_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an ingredient by exact name and unit, used to keep seeding idempotent.
pub async fn find_ingredient(
    db: &DatabaseConnection,
    name: &str,
    measurement_unit: &str,
) -> Result<Option<ingredient::Model>> {
    Ingredient::find()
        .filter(ingredient::Column::Name.eq(name))
        .filter(ingredient::Column::MeasurementUnit.eq(measurement_unit))
        .one(db)
        .await
        .map_err(Into::into)
}

#[instrument(skip(db))]
pub async fn create_ingredient(
    db: &DatabaseConnection,
    name: String,
    measurement_unit: String,
) -> Result<ingredient::Model> {
    require_text("name", &name, MAX_INGREDIENT_NAME_LENGTH)?;
    require_text("measurement_unit", &measurement_unit, MAX_UNIT_LENGTH)?;

    let ingredient = ingredient::ActiveModel {
        name: Set(name.trim().to_string()),
        measurement_unit: Set(measurement_unit.trim().to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("Created ingredient '{}' (ID: {})", ingredient.name, ingredient.id);
    Ok(ingredient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_search_by_prefix() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_ingredient(&db, "apple", "pcs").await?;
        create_test_ingredient(&db, "apricot", "g").await?;
        create_test_ingredient(&db, "grape apple", "g").await?;
        create_test_ingredient(&db, "banana", "pcs").await?;

        let found = search_ingredients(&db, Some("ap")).await?;
        let names: Vec<_> = found.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["apple", "apricot"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_ingredient(&db, "100% juice", "ml").await?;
        create_test_ingredient(&db, "apple", "pcs").await?;
        create_test_ingredient(&db, "banana", "pcs").await?;

        let percent = search_ingredients(&db, Some("%")).await?;
        assert!(percent.is_empty());
        let juice = search_ingredients(&db, Some("100%")).await?;
        assert_eq!(juice.len(), 1);
        assert_eq!(juice[0].name, "100% juice");
        assert!(search_ingredients(&db, Some("_p")).await?.is_empty());
        assert!(search_ingredients(&db, Some("\\")).await?.is_empty());
        Ok(())
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a_b%c\\d"), "a\\_b\\%c\\\\d");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn test_search_without_prefix_returns_all_sorted() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_ingredient(&db, "salt", "g").await?;
        create_test_ingredient(&db, "flour", "g").await?;

        let all = search_ingredients(&db, None).await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "flour");

        let empty_prefix = search_ingredients(&db, Some("")).await?;
        assert_eq!(empty_prefix.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_find_ingredient_matches_name_and_unit() -> Result<()> {
        let db = setup_test_db().await?;
        let flour = create_test_ingredient(&db, "flour", "g").await?;

        assert_eq!(find_ingredient(&db, "flour", "g").await?, Some(flour.clone()));
        assert!(find_ingredient(&db, "flour", "kg").await?.is_none());
        assert_eq!(get_ingredient_by_id(&db, flour.id).await?, Some(flour));
        Ok(())
    }
}
