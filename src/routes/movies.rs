use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::require_movie,
    error::AppResult,
    models::{CreateMovieRequest, Movie, RateMovieRequest, UpdateMovieRequest},
    routes::AppState,
};

/// Lists every movie on the watchlist
pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.list_movies().await?))
}

/// Adds a movie with its basic fields
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateMovieRequest>,
) -> AppResult<(StatusCode, Json<Movie>)> {
    let movie = Movie::new(request.title, request.director, request.year);
    state.movies.insert_movie(&movie).await?;

    tracing::info!(movie_id = %movie.id, title = %movie.title, "Movie added");

    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Movie>> {
    Ok(Json(require_movie(state.movies.as_ref(), id).await?))
}

/// Replaces a movie's extended metadata
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMovieRequest>,
) -> AppResult<Json<Movie>> {
    let mut movie = require_movie(state.movies.as_ref(), id).await?;
    movie.apply_update(request);
    state.movies.update_movie(&movie).await?;

    tracing::info!(movie_id = %id, "Movie updated");

    Ok(Json(require_movie(state.movies.as_ref(), id).await?))
}

pub async fn rate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<RateMovieRequest>,
) -> AppResult<Json<Movie>> {
    state.movies.set_rating(id, request.rating).await?;
    Ok(Json(require_movie(state.movies.as_ref(), id).await?))
}

/// Records that the movie was watched now
pub async fn mark_watched(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Movie>> {
    state.movies.set_last_watched(id, Utc::now()).await?;
    Ok(Json(require_movie(state.movies.as_ref(), id).await?))
}
