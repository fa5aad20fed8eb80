//! Tag and ingredient seeding from config.toml
//!
//! The seed file lists the tags a fresh installation starts with and may point at a
//! JSON ingredient catalogue. Seeding runs on every startup and skips rows that
//! already exist, so editing the file and restarting only adds what is new.

use crate::{
    core::{ingredient, tag},
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct SeedConfig {
    /// Tags to create
    #[serde(default)]
    pub tags: Vec<TagSeed>,
    /// JSON file with an array of `{name, measurement_unit}` objects,
    /// resolved relative to the seed file
    pub ingredients_file: Option<PathBuf>,
}

/// A single tag entry
#[derive(Debug, Deserialize, Clone)]
pub struct TagSeed {
    pub name: String,
    pub slug: String,
}

/// A single ingredient entry of the JSON catalogue
#[derive(Debug, Deserialize, Clone)]
pub struct IngredientSeed {
    pub name: String,
    pub measurement_unit: String,
}

/// Totals reported after seeding
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub tags_created: usize,
    pub ingredients_created: usize,
}

/// Loads the seed configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SeedConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read seed file {}: {e}", path.as_ref().display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path.as_ref().display()),
    })
}

/// Parses a JSON ingredient catalogue.
pub fn parse_ingredients(json: &str) -> Result<Vec<IngredientSeed>> {
    serde_json::from_str(json).map_err(|e| Error::Config {
        message: format!("Failed to parse ingredient catalogue: {e}"),
    })
}

/// Seeds tags and ingredients described by the file at `path`.
///
/// A missing seed file is not an error: the server simply starts empty.
pub async fn seed_from_file(db: &DatabaseConnection, path: &Path) -> Result<SeedReport> {
    if !path.exists() {
        warn!("Seed file {} not found, skipping seeding.", path.display());
        return Ok(SeedReport::default());
    }

    let config = load_config(path)?;
    let ingredients = match &config.ingredients_file {
        Some(file) => {
            let resolved = path.parent().map_or_else(|| file.clone(), |dir| dir.join(file));
            let json = std::fs::read_to_string(&resolved).map_err(|e| Error::Config {
                message: format!("Failed to read {}: {e}", resolved.display()),
            })?;
            parse_ingredients(&json)?
        }
        None => Vec::new(),
    };

    seed(db, &config.tags, &ingredients).await
}

/// Inserts every tag and ingredient that is not stored yet.
pub async fn seed(
    db: &DatabaseConnection,
    tags: &[TagSeed],
    ingredients: &[IngredientSeed],
) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for seed in tags {
        if tag::get_tag_by_slug(db, &seed.slug).await?.is_some() {
            continue;
        }
        tag::create_tag(db, seed.name.clone(), seed.slug.clone()).await?;
        report.tags_created += 1;
    }

    for seed in ingredients {
        if ingredient::find_ingredient(db, &seed.name, &seed.measurement_unit)
            .await?
            .is_some()
        {
            continue;
        }
        ingredient::create_ingredient(db, seed.name.clone(), seed.measurement_unit.clone())
            .await?;
        report.ingredients_created += 1;
    }

    info!(
        "Seeding finished: {} new tags, {} new ingredients.",
        report.tags_created, report.ingredients_created
    );
    Ok(report)
}
