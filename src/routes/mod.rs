use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{
    db::MovieStore,
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::RecommendationService,
};

pub mod movies;
pub mod recommendations;

/// State shared by all handlers
pub struct AppState {
    pub movies: Arc<dyn MovieStore>,
    pub recommendations: Arc<RecommendationService>,
    /// Similar-movie count used when a request does not specify one
    pub default_recommendation_count: usize,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(movies::list).post(movies::create))
        .route("/movies/:id", get(movies::get).put(movies::update))
        .route("/movies/:id/rating", post(movies::rate))
        .route("/movies/:id/watched", post(movies::mark_watched))
        .route(
            "/movies/:id/recommendations",
            post(recommendations::recommend),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
