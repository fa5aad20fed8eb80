//! Token login and logout.

use crate::{
    api::{AppState, auth::CurrentUser, serializers::{LoginRequest, TokenResponse}},
    core::auth,
    errors::Result,
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

/// `POST /api/auth/token/login/`
pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>> {
    let Json(req) = body?;
    let auth_token = auth::login(&state.db, &req.email, &req.password).await?;
    Ok(Json(TokenResponse { auth_token }))
}

/// `POST /api/auth/token/logout/`
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode> {
    auth::logout(&state.db, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
