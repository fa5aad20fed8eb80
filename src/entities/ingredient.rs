//! Ingredient entity - The shared ingredient catalogue.
//!
//! Ingredients are not owned by any user; recipes reference them through
//! [`super::ingredient_recipe`] rows that carry the amount.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ingredient database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingredients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the ingredient (e.g., "flour")
    pub name: String,
    /// Unit the amount is expressed in (e.g., "g")
    pub measurement_unit: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ingredient_recipe::Entity")]
    IngredientRecipes,
}

impl Related<super::ingredient_recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IngredientRecipes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
