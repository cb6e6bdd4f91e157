use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    db::CacheKey,
    error::AppResult,
    middleware::{CurrentUser, MaybeUser, RequestId},
    models::{
        CreatePostRequest, PostDetail, PostListQuery, PostPage, ReactionSummary, UpdatePostRequest,
    },
    routes::AppState,
    services::{
        posts,
        reactions::{self, ReactionKind},
        users,
    },
};

/// Tag counts change with every post write
fn invalidate_tag_cloud(state: &AppState) {
    state.cache.invalidate(&CacheKey::TagCloud);
}

/// Published posts, newest first
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PostListQuery>,
) -> AppResult<Json<PostPage>> {
    Ok(Json(posts::list_posts(&state.db_pool, &query).await?))
}

/// Create a post
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<PostDetail>)> {
    let author = users::load_actor(&state.db_pool, user_id).await?;
    let post = posts::create_post(&state.db_pool, author.id, request).await?;
    invalidate_tag_cloud(&state);

    tracing::info!(request_id = %request_id, post_id = post.post.id, "Post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// Get a single post
pub async fn show(
    State(state): State<Arc<AppState>>,
    MaybeUser(viewer_id): MaybeUser,
    Path(post_id): Path<i64>,
) -> AppResult<Json<PostDetail>> {
    let viewer = match viewer_id {
        Some(id) => users::find_user(&state.db_pool, id).await?,
        None => None,
    };
    let post = posts::view_post(&state.db_pool, post_id, viewer.as_ref()).await?;
    Ok(Json(post))
}

/// Update a post
pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(post_id): Path<i64>,
    Json(request): Json<UpdatePostRequest>,
) -> AppResult<Json<PostDetail>> {
    let actor = users::load_actor(&state.db_pool, user_id).await?;
    let post = posts::update_post(&state.db_pool, &actor, post_id, request).await?;
    invalidate_tag_cloud(&state);
    Ok(Json(post))
}

/// Delete a post
pub async fn remove(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<StatusCode> {
    let actor = users::load_actor(&state.db_pool, user_id).await?;
    posts::delete_post(&state.db_pool, &actor, post_id).await?;
    invalidate_tag_cloud(&state);
    Ok(StatusCode::NO_CONTENT)
}

async fn react(
    state: &AppState,
    user_id: i64,
    post_id: i64,
    kind: ReactionKind,
) -> AppResult<ReactionSummary> {
    let actor = users::load_actor(&state.db_pool, user_id).await?;
    reactions::toggle_reaction(&state.db_pool, actor.id, post_id, kind).await
}

/// Toggle a like
pub async fn like(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<Json<ReactionSummary>> {
    let summary = react(&state, user_id, post_id, ReactionKind::Like).await?;
    Ok(Json(summary))
}

/// Toggle a dislike
pub async fn dislike(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(post_id): Path<i64>,
) -> AppResult<Json<ReactionSummary>> {
    let summary = react(&state, user_id, post_id, ReactionKind::Dislike).await?;
    Ok(Json(summary))
}
