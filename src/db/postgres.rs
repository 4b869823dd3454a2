use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    db::movies::MovieStore,
    error::{AppError, AppResult},
    models::Movie,
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const MOVIE_COLUMNS: &str = r#"id, title, director, year, "cast", series, tags, description,
    video_link, rating, last_watched, similar_movies"#;

/// Movie store backed by the `movies` table
#[derive(Clone)]
pub struct PgMovieStore {
    pool: PgPool,
}

impl PgMovieStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps an update that touched no rows to `NotFound`
fn expect_row(rows_affected: u64, id: Uuid) -> AppResult<()> {
    if rows_affected == 0 {
        return Err(AppError::NotFound(format!("movie {}", id)));
    }
    Ok(())
}

#[async_trait::async_trait]
impl MovieStore for PgMovieStore {
    async fn insert_movie(&self, movie: &Movie) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO movies ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            MOVIE_COLUMNS
        ))
        .bind(movie.id)
        .bind(&movie.title)
        .bind(&movie.director)
        .bind(movie.year)
        .bind(&movie.cast)
        .bind(&movie.series)
        .bind(&movie.tags)
        .bind(&movie.description)
        .bind(&movie.video_link)
        .bind(movie.rating)
        .bind(movie.last_watched)
        .bind(&movie.similar_movies)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_movie(&self, id: Uuid) -> AppResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {} FROM movies WHERE id = $1",
            MOVIE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movie)
    }

    async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {} FROM movies ORDER BY title, id",
            MOVIE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(movies)
    }

    async fn update_movie(&self, movie: &Movie) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE movies
            SET title = $2, director = $3, year = $4, "cast" = $5, series = $6,
                tags = $7, description = $8, video_link = $9
            WHERE id = $1
            "#,
        )
        .bind(movie.id)
        .bind(&movie.title)
        .bind(&movie.director)
        .bind(movie.year)
        .bind(&movie.cast)
        .bind(&movie.series)
        .bind(&movie.tags)
        .bind(&movie.description)
        .bind(&movie.video_link)
        .execute(&self.pool)
        .await?;

        expect_row(result.rows_affected(), movie.id)
    }

    async fn set_rating(&self, id: Uuid, rating: i32) -> AppResult<()> {
        let result = sqlx::query("UPDATE movies SET rating = $2 WHERE id = $1")
            .bind(id)
            .bind(rating)
            .execute(&self.pool)
            .await?;

        expect_row(result.rows_affected(), id)
    }

    async fn set_last_watched(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let result = sqlx::query("UPDATE movies SET last_watched = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        expect_row(result.rows_affected(), id)
    }

    async fn set_similar_movies(&self, id: Uuid, titles: Vec<String>) -> AppResult<()> {
        let result = sqlx::query("UPDATE movies SET similar_movies = $2 WHERE id = $1")
            .bind(id)
            .bind(titles)
            .execute(&self.pool)
            .await?;

        expect_row(result.rows_affected(), id)
    }
}
