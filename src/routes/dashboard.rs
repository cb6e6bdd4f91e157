use axum::{extract::State, response::Html, Extension};
use std::sync::Arc;

use crate::{
    middleware::{CurrentUser, RequestId},
    render,
    routes::AppState,
    services::{recommendations, settings},
};

/// HTML dashboard with the viewer's suggested posts
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    CurrentUser(user_id): CurrentUser,
) -> Html<String> {
    let suggestions = recommendations::suggest_posts(state.signal_store.as_ref(), user_id).await;
    let site_name = settings::site_name(&state.db_pool).await;

    tracing::debug!(
        request_id = %request_id,
        user_id,
        suggestions = suggestions.len(),
        "Rendering dashboard"
    );

    Html(render::render_dashboard(&site_name, &suggestions))
}
