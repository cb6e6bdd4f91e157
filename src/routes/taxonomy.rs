use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    models::{Category, CategoryCount, CreateCategoryRequest, TagCount},
    routes::AppState,
    services::{taxonomy, users},
};

/// Get all categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<CategoryCount>>> {
    Ok(Json(taxonomy::list_categories(&state.db_pool).await?))
}

/// Create a category (admin only)
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Json<Category>)> {
    users::require_admin(&state.db_pool, user_id).await?;
    let category = taxonomy::create_category(&state.db_pool, &request.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Delete a category (admin only)
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(category_id): Path<i64>,
) -> AppResult<StatusCode> {
    users::require_admin(&state.db_pool, user_id).await?;
    taxonomy::delete_category(&state.db_pool, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Tag cloud with post counts
pub async fn tags(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<TagCount>>> {
    let tags = taxonomy::tag_cloud(&state.db_pool, &state.cache).await?;
    Ok(Json(tags))
}
