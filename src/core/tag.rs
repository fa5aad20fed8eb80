//! Tag business logic.
//!
//! Tags are read-only through the API; they are created by seeding.

use crate::{
    core::require_text,
    entities::{Tag, tag},
    errors::Result,
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, instrument};

/// Maximum length of a tag name.
pub const MAX_TAG_NAME_LENGTH: usize = 32;
/// Maximum length of a tag slug.
pub const MAX_SLUG_LENGTH: usize = 32;

/// Retrieves all tags ordered alphabetically by name.
pub async fn get_all_tags(db: &DatabaseConnection) -> Result<Vec<tag::Model>> {
    Tag::find()
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn get_tag_by_id(db: &DatabaseConnection, tag_id: i64) -> Result<Option<tag::Model>> {
    Tag::find_by_id(tag_id).one(db).await.map_err(Into::into)
}

pub async fn get_tag_by_slug(db: &DatabaseConnection, slug: &str) -> Result<Option<tag::Model>> {
    Tag::find()
        .filter(tag::Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a tag after checking name and slug lengths.
#[instrument(skip(db))]
pub async fn create_tag(db: &DatabaseConnection, name: String, slug: String) -> Result<tag::Model> {
    require_text("name", &name, MAX_TAG_NAME_LENGTH)?;
    require_text("slug", &slug, MAX_SLUG_LENGTH)?;

    let tag = tag::ActiveModel {
        name: Set(name.trim().to_string()),
        slug: Set(slug.trim().to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("Created tag '{}' (ID: {})", tag.slug, tag.id);
    Ok(tag)
}
