use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    models::{Message, SendMessageRequest, UnreadCount},
    routes::AppState,
    services::messages,
};

/// Messages received by the viewer
pub async fn inbox(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<Vec<Message>>> {
    Ok(Json(messages::inbox(&state.db_pool, user_id).await?))
}

/// Messages sent by the viewer
pub async fn sent(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<Vec<Message>>> {
    Ok(Json(messages::sent(&state.db_pool, user_id).await?))
}

/// Number of unread messages
pub async fn unread(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Json<UnreadCount>> {
    let unread = messages::unread_count(&state.db_pool, user_id).await?;
    Ok(Json(UnreadCount { unread }))
}

/// Send a private message
pub async fn send(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let message = messages::send_message(&state.db_pool, user_id, request).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Open a message, marking it read for the recipient
pub async fn read(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(message_id): Path<i64>,
) -> AppResult<Json<Message>> {
    let message = messages::read_message(&state.db_pool, user_id, message_id).await?;
    Ok(Json(message))
}

/// Delete a message the viewer sent or received
pub async fn remove(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(message_id): Path<i64>,
) -> AppResult<StatusCode> {
    messages::delete_message(&state.db_pool, user_id, message_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
