//! Recipe entity - The central content type.
//!
//! A recipe belongs to one author and links to ingredients (with amounts) and
//! tags through join tables. Listings are ordered newest first by `pub_date`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recipe database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipes")]
pub struct Model {
    /// Unique identifier for the recipe
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the user who published the recipe
    pub author_id: i64,
    /// Recipe title
    pub name: String,
    /// Media path of the recipe image
    pub image: String,
    /// Free-form description and instructions
    pub text: String,
    /// Cooking time in minutes, at least 1
    pub cooking_time: i32,
    /// When the recipe was published
    pub pub_date: DateTimeUtc,
}

/// Defines relationships between Recipe and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each recipe belongs to one author
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
    #[sea_orm(has_many = "super::ingredient_recipe::Entity")]
    IngredientRecipes,
    #[sea_orm(has_many = "super::recipe_tag::Entity")]
    RecipeTags,
    #[sea_orm(has_one = "super::shortened_url::Entity")]
    ShortenedUrl,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::ingredient_recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IngredientRecipes.def()
    }
}

impl Related<super::recipe_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeTags.def()
    }
}

impl Related<super::shortened_url::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShortenedUrl.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
