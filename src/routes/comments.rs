use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    models::{Comment, CreateCommentRequest},
    routes::AppState,
    services::{comments, users},
};

/// Comments on a published post, oldest first
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<i64>,
) -> AppResult<Json<Vec<Comment>>> {
    let list = comments::list_comments(&state.db_pool, post_id).await?;
    Ok(Json(list))
}

/// Comment on a post
pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(post_id): Path<i64>,
    Json(request): Json<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let author = users::load_actor(&state.db_pool, user_id).await?;
    let comment =
        comments::add_comment(&state.db_pool, author.id, post_id, &request.content).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Delete a comment (its author or an admin)
pub async fn remove(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(comment_id): Path<i64>,
) -> AppResult<StatusCode> {
    let actor = users::load_actor(&state.db_pool, user_id).await?;
    comments::delete_comment(&state.db_pool, &actor, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
