use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    models::{LoginRequest, RegisterRequest, User, UserProfile, UserSummary},
    routes::AppState,
    services::{follows, users},
};

/// Register a new account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = users::register(&state.db_pool, request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Verifies credentials; session issuance happens upstream
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<User>> {
    let user = users::verify_credentials(&state.db_pool, request).await?;
    tracing::info!(user_id = user.id, "Credentials verified");
    Ok(Json(user))
}

/// Public profile of a user
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(users::get_profile(&state.db_pool, user_id).await?))
}

/// Users following this user
pub async fn followers(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<UserSummary>>> {
    Ok(Json(follows::followers(&state.db_pool, user_id).await?))
}

/// Users this user follows
pub async fn following(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<UserSummary>>> {
    Ok(Json(follows::following(&state.db_pool, user_id).await?))
}

/// Follow a user
pub async fn follow(
    State(state): State<Arc<AppState>>,
    CurrentUser(follower_id): CurrentUser,
    Path(user_id): Path<i64>,
) -> AppResult<StatusCode> {
    follows::follow(&state.db_pool, follower_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Unfollow a user
pub async fn unfollow(
    State(state): State<Arc<AppState>>,
    CurrentUser(follower_id): CurrentUser,
    Path(user_id): Path<i64>,
) -> AppResult<StatusCode> {
    follows::unfollow(&state.db_pool, follower_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
