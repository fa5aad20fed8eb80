//! `/api/recipes/` handlers, including favorites, the cart and the shopping list.

use crate::{
    api::{
        AppState,
        auth::{CurrentUser, MaybeUser},
        handlers::{PathParam, query_value},
        pagination::{Page, PageRequest, fetch_page},
        serializers::{
            RecipeRequest, RecipeResponse, RecipeShortResponse, RecipeUpdateRequest, recipe_short,
        },
    },
    core::{
        membership::{self, RecipeMembership},
        recipe::{self, RecipeFilter},
        shopping_list,
    },
    entities::{Favorite, ShoppingCart},
    errors::{Error, Result},
    media::EncodedImage,
};
use axum::{
    Json,
    extract::{OriginalUri, Path, Query, State, rejection::JsonRejection},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::IntoResponse,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection};

type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

/// Folder recipe images are stored under.
const IMAGE_FOLDER: &str = "recipes";

fn is_truthy(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "True"))
}

/// Reads listing filters from raw query pairs; `tags` may repeat.
fn parse_filter(params: &[(String, String)]) -> Result<RecipeFilter> {
    let author = query_value(params, "author")
        .map(|raw| {
            raw.parse::<i64>()
                .map_err(|_| Error::validation("author", "Enter a valid user id."))
        })
        .transpose()?;
    Ok(RecipeFilter {
        tags: params
            .iter()
            .filter(|(key, _)| key == "tags")
            .map(|(_, slug)| slug.clone())
            .collect(),
        author,
        is_favorited: is_truthy(query_value(params, "is_favorited")),
        is_in_shopping_cart: is_truthy(query_value(params, "is_in_shopping_cart")),
    })
}

async fn full_response(
    state: &AppState,
    recipe: crate::entities::recipe::Model,
    viewer: Option<i64>,
) -> Result<RecipeResponse> {
    let details = recipe::load_details(&state.db, recipe, viewer).await?;
    Ok(RecipeResponse::new(details, &*state.media))
}

/// `GET /api/recipes/`
pub async fn list_recipes(
    State(state): State<AppState>,
    viewer: MaybeUser,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Page<RecipeResponse>>> {
    let filter = parse_filter(&params)?;
    let request = PageRequest::from_query(&params)?;
    let query = recipe::filtered_recipes(&state.db, &filter, viewer.id()).await?;
    let (recipes, info) = fetch_page(&state.db, query, request, &state.request_url(&uri)?).await?;

    let mut results = Vec::with_capacity(recipes.len());
    for model in recipes {
        results.push(full_response(&state, model, viewer.id()).await?);
    }
    Ok(Json(info.into_page(results)))
}

/// `GET /api/recipes/{id}/`
pub async fn get_recipe(
    State(state): State<AppState>,
    viewer: MaybeUser,
    path: PathParam<i64>,
) -> Result<Json<RecipeResponse>> {
    let Path(recipe_id) = path?;
    let model = recipe::get_recipe(&state.db, recipe_id).await?;
    Ok(Json(full_response(&state, model, viewer.id()).await?))
}

/// `POST /api/recipes/`
pub async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(author): CurrentUser,
    body: JsonBody<RecipeRequest>,
) -> Result<(StatusCode, Json<RecipeResponse>)> {
    let Json(req) = body?;
    let image = EncodedImage::from_data_url("image", &req.image)?;
    let path = state.media.save(IMAGE_FOLDER, &image).await?;

    let created = match recipe::create_recipe(&state.db, author.id, req.into_input(path.clone())).await {
        Ok(created) => created,
        Err(err) => {
            state.discard_media(&path).await;
            return Err(err);
        }
    };
    Ok((
        StatusCode::CREATED,
        Json(full_response(&state, created, Some(author.id)).await?),
    ))
}

/// `PATCH /api/recipes/{id}/`
pub async fn update_recipe(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    path: PathParam<i64>,
    body: JsonBody<RecipeUpdateRequest>,
) -> Result<Json<RecipeResponse>> {
    let Path(recipe_id) = path?;
    let Json(req) = body?;
    let previous_image = recipe::get_recipe(&state.db, recipe_id).await?.image;

    let new_image = match req.image.as_deref() {
        Some(data_url) => {
            let image = EncodedImage::from_data_url("image", data_url)?;
            Some(state.media.save(IMAGE_FOLDER, &image).await?)
        }
        None => None,
    };

    let updated = match recipe::update_recipe(
        &state.db,
        &actor,
        recipe_id,
        req.into_update(new_image.clone()),
    )
    .await
    {
        Ok(updated) => updated,
        Err(err) => {
            if let Some(path) = &new_image {
                state.discard_media(path).await;
            }
            return Err(err);
        }
    };
    if new_image.is_some() {
        state.discard_media(&previous_image).await;
    }
    Ok(Json(full_response(&state, updated, Some(actor.id)).await?))
}

/// `DELETE /api/recipes/{id}/`
pub async fn delete_recipe(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    path: PathParam<i64>,
) -> Result<StatusCode> {
    let Path(recipe_id) = path?;
    let deleted = recipe::delete_recipe(&state.db, &actor, recipe_id).await?;
    state.discard_media(&deleted.image).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to<M>(
    state: &AppState,
    user_id: i64,
    recipe_id: i64,
) -> Result<(StatusCode, Json<RecipeShortResponse>)>
where
    M: RecipeMembership,
    M::Model: Send + Sync,
    M::ActiveModel: ActiveModelTrait<Entity = M> + Send,
{
    let recipe = membership::add::<M>(&state.db, user_id, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(recipe_short(&recipe, &*state.media))))
}

async fn remove_from<M>(db: &DatabaseConnection, user_id: i64, recipe_id: i64) -> Result<StatusCode>
where
    M: RecipeMembership,
    M::Model: Send + Sync,
{
    membership::remove::<M>(db, user_id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/recipes/{id}/favorite/`
pub async fn add_favorite(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    path: PathParam<i64>,
) -> Result<(StatusCode, Json<RecipeShortResponse>)> {
    let Path(recipe_id) = path?;
    add_to::<Favorite>(&state, current.id, recipe_id).await
}

/// `DELETE /api/recipes/{id}/favorite/`
pub async fn remove_favorite(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    path: PathParam<i64>,
) -> Result<StatusCode> {
    let Path(recipe_id) = path?;
    remove_from::<Favorite>(&state.db, current.id, recipe_id).await
}

/// `POST /api/recipes/{id}/shopping_cart/`
pub async fn add_to_cart(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    path: PathParam<i64>,
) -> Result<(StatusCode, Json<RecipeShortResponse>)> {
    let Path(recipe_id) = path?;
    add_to::<ShoppingCart>(&state, current.id, recipe_id).await
}

/// `DELETE /api/recipes/{id}/shopping_cart/`
pub async fn remove_from_cart(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    path: PathParam<i64>,
) -> Result<StatusCode> {
    let Path(recipe_id) = path?;
    remove_from::<ShoppingCart>(&state.db, current.id, recipe_id).await
}

/// `GET /api/recipes/download_shopping_cart/`
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<impl IntoResponse> {
    let lines = shopping_list::shopping_list(&state.db, current.id).await?;
    Ok((
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (CONTENT_DISPOSITION, "attachment; filename=\"shopping_cart.txt\""),
        ],
        shopping_list::render(&lines),
    ))
}
