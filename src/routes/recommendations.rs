use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{RecommendationQuery, RecommendationResponse},
    routes::AppState,
};

/// Recomputes and returns a movie's similar movies
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(movie_id): Path<Uuid>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    let k = params.k.unwrap_or(state.default_recommendation_count);

    tracing::info!(
        request_id = %request_id,
        movie_id = %movie_id,
        k,
        "Processing recommendation request"
    );

    let similar_movies = state.recommendations.recommend(movie_id, k).await?;

    tracing::info!(
        request_id = %request_id,
        count = similar_movies.len(),
        "Recommendation completed"
    );

    Ok(Json(RecommendationResponse {
        movie_id,
        similar_movies,
    }))
}
