//! Shortened URL entity - Maps a short code to a recipe's canonical URL.
//!
//! Rows are created lazily the first time a link is requested and are never
//! updated afterwards.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Short link database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shortened_urls")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Absolute canonical URL of the recipe
    #[sea_orm(unique)]
    pub original_url: String,
    /// Fixed-length alphanumeric code
    #[sea_orm(unique)]
    pub short_url: String,
    #[sea_orm(unique)]
    pub recipe_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::recipe::Entity",
        from = "Column::RecipeId",
        to = "super::recipe::Column::Id",
        on_delete = "Cascade"
    )]
    Recipe,
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
