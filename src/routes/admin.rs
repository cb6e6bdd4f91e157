use axum::{extract::State, Extension, Json};
use std::{collections::BTreeMap, sync::Arc};

use crate::{
    error::{AppError, AppResult},
    middleware::{CurrentUser, RequestId},
    models::AdminStats,
    routes::AppState,
    services::{
        admin_stats,
        assistant::{self, AssistRequest, AssistResponse},
        settings, users,
    },
};

/// Dashboard statistics (admin only)
pub async fn stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<AdminStats>> {
    users::require_admin(&state.db_pool, user_id).await?;
    let stats = admin_stats::admin_stats(
        &state.db_pool,
        &state.cache,
        state.config.stats_cache_ttl_secs,
    )
    .await?;
    Ok(Json(stats))
}

/// List all site settings (admin only)
pub async fn settings(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<BTreeMap<String, String>>> {
    users::require_admin(&state.db_pool, user_id).await?;
    Ok(Json(settings::all_settings(&state.db_pool).await?))
}

/// Applies every entry of the body; nothing is written if any entry is invalid
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(changes): Json<BTreeMap<String, String>>,
) -> AppResult<Json<BTreeMap<String, String>>> {
    // Non-admins learn nothing about which keys are valid
    let admin = users::require_admin(&state.db_pool, user_id).await?;

    settings::update_settings(&state.db_pool, &changes).await?;
    tracing::info!(admin_id = admin.id, "Settings updated");

    Ok(Json(settings::all_settings(&state.db_pool).await?))
}

/// Run an AI writing task, if enabled in settings
pub async fn assist(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<AssistRequest>,
) -> AppResult<Json<AssistResponse>> {
    users::require_admin(&state.db_pool, user_id).await?;
    if !settings::assist_enabled(&state.db_pool).await? {
        return Err(AppError::Forbidden(
            "AI assistance is disabled on this site".to_string(),
        ));
    }

    tracing::info!(request_id = %request_id, task = ?request.task, "Processing assistance request");

    let response = assistant::assist(state.assistant.as_ref(), request).await?;
    Ok(Json(response))
}
