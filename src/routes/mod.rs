use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

pub mod admin;
pub mod comments;
pub mod dashboard;
pub mod messages;
pub mod posts;
pub mod recommendations;
pub mod state;
pub mod taxonomy;
pub mod users;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(make_span_with_request_id);

    Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(dashboard::dashboard))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(trace),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/recommendations", get(recommendations::recommendations))
        .route("/users", post(users::register))
        .route("/login", post(users::login))
        .route("/users/:id", get(users::profile))
        .route("/users/:id/followers", get(users::followers))
        .route("/users/:id/following", get(users::following))
        .route(
            "/users/:id/follow",
            post(users::follow).delete(users::unfollow),
        )
        .route("/posts", get(posts::list).post(posts::create))
        .route(
            "/posts/:id",
            get(posts::show).put(posts::update).delete(posts::remove),
        )
        .route("/posts/:id/like", post(posts::like))
        .route("/posts/:id/dislike", post(posts::dislike))
        .route(
            "/posts/:id/comments",
            get(comments::list).post(comments::create),
        )
        .route("/comments/:id", delete(comments::remove))
        .route(
            "/categories",
            get(taxonomy::list_categories).post(taxonomy::create_category),
        )
        .route("/categories/:id", delete(taxonomy::delete_category))
        .route("/tags", get(taxonomy::tags))
        .route("/messages", get(messages::inbox).post(messages::send))
        .route("/messages/sent", get(messages::sent))
        .route("/messages/unread", get(messages::unread))
        .route(
            "/messages/:id",
            get(messages::read).delete(messages::remove),
        )
        .route("/admin/stats", get(admin::stats))
        .route(
            "/admin/settings",
            get(admin::settings).put(admin::update_settings),
        )
        .route("/admin/assist", post(admin::assist))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
