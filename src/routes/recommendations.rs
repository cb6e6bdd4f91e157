use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::{
    middleware::{CurrentUser, RequestId},
    models::SuggestedPost,
    routes::AppState,
    services::recommendations,
};

/// Personalized suggestions for the viewer. Always 200; failures yield `[]`.
pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
) -> Json<Vec<SuggestedPost>> {
    tracing::info!(request_id = %request_id, user_id, "Processing recommendations request");

    let suggestions = recommendations::suggest_posts(state.signal_store.as_ref(), user_id).await;

    tracing::info!(
        request_id = %request_id,
        count = suggestions.len(),
        "Recommendations returned"
    );

    Json(suggestions)
}
