//! Read-only tag and ingredient endpoints. Neither is paginated.

use crate::{
    api::{
        AppState,
        handlers::{PathParam, query_value},
    },
    core::{ingredient, tag},
    entities::{ingredient as ingredient_entity, tag as tag_entity},
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, Query, State},
};

/// `GET /api/tags/`
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<tag_entity::Model>>> {
    Ok(Json(tag::get_all_tags(&state.db).await?))
}

/// `GET /api/tags/{id}/`
pub async fn get_tag(
    State(state): State<AppState>,
    path: PathParam<i64>,
) -> Result<Json<tag_entity::Model>> {
    let Path(tag_id) = path?;
    tag::get_tag_by_id(&state.db, tag_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Tag", tag_id))
}

/// `GET /api/ingredients/?name=<prefix>`
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<ingredient_entity::Model>>> {
    let prefix = query_value(&params, "name");
    Ok(Json(ingredient::search_ingredients(&state.db, prefix).await?))
}

/// `GET /api/ingredients/{id}/`
pub async fn get_ingredient(
    State(state): State<AppState>,
    path: PathParam<i64>,
) -> Result<Json<ingredient_entity::Model>> {
    let Path(ingredient_id) = path?;
    ingredient::get_ingredient_by_id(&state.db, ingredient_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Ingredient", ingredient_id))
}
