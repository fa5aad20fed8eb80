//! Short links: allocation and redirect.

use crate::{
    api::{AppState, handlers::PathParam, serializers::ShortLinkResponse},
    core::short_link,
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header::LOCATION},
    response::IntoResponse,
};
use tracing::debug;

/// `GET /api/recipes/{id}/get-link/`
pub async fn get_link(
    State(state): State<AppState>,
    path: PathParam<i64>,
) -> Result<Json<ShortLinkResponse>> {
    let Path(recipe_id) = path?;
    let canonical = state
        .settings
        .absolute_url(&format!("/api/recipes/{recipe_id}/"));
    let link = short_link::get_or_create_short_link(&state.db, recipe_id, &canonical).await?;
    Ok(Json(ShortLinkResponse {
        short_link: state
            .settings
            .absolute_url(&format!("/s/{}/", link.short_url)),
    }))
}

/// `GET /s/{code}/` redirects to the stored recipe URL.
pub async fn redirect(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse> {
    let link = short_link::resolve_code(&state.db, &code).await?;
    debug!("Redirecting {} to {}", code, link.original_url);
    Ok((StatusCode::FOUND, [(LOCATION, link.original_url)]))
}
