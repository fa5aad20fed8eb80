//! Shopping-list aggregation.
//!
//! Sums ingredient amounts over every recipe in a user's cart. Lines are grouped
//! by ingredient identity, so two ingredients that share a name but differ in
//! unit stay separate.

use crate::{
    core::membership,
    entities::{Ingredient, IngredientRecipe, ShoppingCart, ingredient_recipe},
    errors::Result,
};
use sea_orm::prelude::*;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::{debug, instrument};

/// One aggregated line of the shopping list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Aggregates the cart of `user_id`, ordered by ingredient name.
#[instrument(skip(db))]
pub async fn shopping_list(db: &DatabaseConnection, user_id: i64) -> Result<Vec<ShoppingListLine>> {
    let recipe_ids = membership::recipe_ids_for_user::<ShoppingCart>(db, user_id).await?;
    if recipe_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = IngredientRecipe::find()
        .filter(ingredient_recipe::Column::RecipeId.is_in(recipe_ids))
        .find_also_related(Ingredient)
        .all(db)
        .await?;

    let mut totals: BTreeMap<(String, String, i64), i64> = BTreeMap::new();
    for (line, ingredient) in rows {
        if let Some(ingredient) = ingredient {
            *totals
                .entry((ingredient.name, ingredient.measurement_unit, ingredient.id))
                .or_default() += i64::from(line.amount);
        }
    }
    debug!("Shopping list for user {} has {} lines", user_id, totals.len());

    Ok(totals
        .into_iter()
        .map(|((name, measurement_unit, _), total)| ShoppingListLine {
            name,
            measurement_unit,
            total,
        })
        .collect())
}

/// Renders lines as `"{name} ({unit}) — {total}\n"` each.
#[must_use]
pub fn render(lines: &[ShoppingListLine]) -> String {
    lines.iter().fold(String::new(), |mut out, line| {
        let _ = writeln!(out, "{} ({}) — {}", line.name, line.measurement_unit, line.total);
        out
    })
}
