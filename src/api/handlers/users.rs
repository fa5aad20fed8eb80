//! `/api/users/` handlers.

use crate::{
    api::{
        AppState,
        auth::{CurrentUser, MaybeUser},
        handlers::{PathParam, recipes_limit},
        pagination::{Page, PageRequest, fetch_page},
        serializers::{
            AvatarRequest, AvatarResponse, CreateUserRequest, SetPasswordRequest,
            SubscriptionResponse, UserCreatedResponse, UserResponse,
        },
    },
    core::{subscription, user},
    errors::{Error, Result},
    media::EncodedImage,
};
use axum::{
    Json,
    extract::{OriginalUri, Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};

type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

/// `POST /api/users/`
pub async fn create_user(
    State(state): State<AppState>,
    body: JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserCreatedResponse>)> {
    let Json(req) = body?;
    let created = user::register(&state.db, req.into()).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// `GET /api/users/`
pub async fn list_users(
    State(state): State<AppState>,
    viewer: MaybeUser,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Page<UserResponse>>> {
    let request = PageRequest::from_query(&params)?;
    let (users, info) =
        fetch_page(&state.db, user::all_users(), request, &state.request_url(&uri)?).await?;

    let mut results = Vec::with_capacity(users.len());
    for model in users {
        results.push(UserResponse::for_viewer(&state.db, model, viewer.id(), &*state.media).await?);
    }
    Ok(Json(info.into_page(results)))
}

/// `GET /api/users/{id}/`
pub async fn get_user(
    State(state): State<AppState>,
    viewer: MaybeUser,
    path: PathParam<i64>,
) -> Result<Json<UserResponse>> {
    let Path(user_id) = path?;
    let model = user::get_user(&state.db, user_id).await?;
    Ok(Json(
        UserResponse::for_viewer(&state.db, model, viewer.id(), &*state.media).await?,
    ))
}

/// `GET /api/users/me/`
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Json<UserResponse> {
    Json(UserResponse::new(current, false, &*state.media))
}

/// `POST /api/users/set_password/`
pub async fn set_password(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    body: JsonBody<SetPasswordRequest>,
) -> Result<StatusCode> {
    let Json(req) = body?;
    user::set_password(&state.db, current.id, &req.current_password, &req.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/users/me/avatar/`
pub async fn put_avatar(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    body: JsonBody<AvatarRequest>,
) -> Result<Json<AvatarResponse>> {
    let Json(req) = body?;
    let data_url = req
        .avatar
        .ok_or_else(|| Error::validation("avatar", "This field is required."))?;
    let image = EncodedImage::from_data_url("avatar", &data_url)?;

    let path = state.media.save("users", &image).await?;
    let previous = match user::set_avatar(&state.db, current.id, path.clone()).await {
        Ok((_, previous)) => previous,
        Err(err) => {
            state.discard_media(&path).await;
            return Err(err);
        }
    };
    if let Some(old) = previous {
        state.discard_media(&old).await;
    }
    Ok(Json(AvatarResponse {
        avatar: state.media.url(&path),
    }))
}

/// `DELETE /api/users/me/avatar/`
pub async fn delete_avatar(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<StatusCode> {
    let removed = user::clear_avatar(&state.db, current.id).await?;
    state.media.delete(&removed).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/users/subscriptions/`
pub async fn subscriptions(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Page<SubscriptionResponse>>> {
    let limit = recipes_limit(&params)?;
    let request = PageRequest::from_query(&params)?;
    let (authors, info) = fetch_page(
        &state.db,
        subscription::followed_users(current.id),
        request,
        &state.request_url(&uri)?,
    )
    .await?;

    let mut results = Vec::with_capacity(authors.len());
    for author in authors {
        results.push(SubscriptionResponse::load(&state.db, author, limit, &*state.media).await?);
    }
    Ok(Json(info.into_page(results)))
}

/// `POST /api/users/{id}/subscribe/`
pub async fn subscribe(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    path: PathParam<i64>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<(StatusCode, Json<SubscriptionResponse>)> {
    let Path(author_id) = path?;
    let limit = recipes_limit(&params)?;
    let author = subscription::subscribe(&state.db, current.id, author_id).await?;
    let body = SubscriptionResponse::load(&state.db, author, limit, &*state.media).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

/// `DELETE /api/users/{id}/subscribe/`
pub async fn unsubscribe(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    path: PathParam<i64>,
) -> Result<StatusCode> {
    let Path(author_id) = path?;
    subscription::unsubscribe(&state.db, current.id, author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
