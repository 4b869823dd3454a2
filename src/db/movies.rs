use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Movie,
};

/// Access to stored movie records
///
/// Updates addressed to an unknown id fail with `AppError::NotFound`.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieStore: Send + Sync {
    async fn insert_movie(&self, movie: &Movie) -> AppResult<()>;

    async fn get_movie(&self, id: Uuid) -> AppResult<Option<Movie>>;

    async fn list_movies(&self) -> AppResult<Vec<Movie>>;

    /// Writes the editable fields of `movie`
    ///
    /// Rating, watch history and `similar_movies` are left as stored, since
    /// they have their own setters.
    async fn update_movie(&self, movie: &Movie) -> AppResult<()>;

    async fn set_rating(&self, id: Uuid, rating: i32) -> AppResult<()>;

    async fn set_last_watched(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// Overwrites the stored recommendation list
    async fn set_similar_movies(&self, id: Uuid, titles: Vec<String>) -> AppResult<()>;
}

/// Fetches a movie, treating absence as `NotFound`
pub async fn require_movie(store: &dyn MovieStore, id: Uuid) -> AppResult<Movie> {
    store
        .get_movie(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("movie {}", id)))
}

/// Movie store held in process memory
#[derive(Default)]
pub struct InMemoryMovieStore {
    movies: RwLock<HashMap<Uuid, Movie>>,
}

impl InMemoryMovieStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn modify(&self, id: Uuid, f: impl FnOnce(&mut Movie)) -> AppResult<()> {
        let mut movies = self.movies.write().await;
        let movie = movies
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("movie {}", id)))?;
        f(movie);
        Ok(())
    }
}

#[async_trait::async_trait]
impl MovieStore for InMemoryMovieStore {
    async fn insert_movie(&self, movie: &Movie) -> AppResult<()> {
        let mut movies = self.movies.write().await;
        if movies.contains_key(&movie.id) {
            return Err(AppError::InvalidInput(format!(
                "movie {} already exists",
                movie.id
            )));
        }
        movies.insert(movie.id, movie.clone());
        Ok(())
    }

    async fn get_movie(&self, id: Uuid) -> AppResult<Option<Movie>> {
        Ok(self.movies.read().await.get(&id).cloned())
    }

    async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        let mut movies: Vec<Movie> = self.movies.read().await.values().cloned().collect();
        movies.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(movies)
    }

    async fn update_movie(&self, movie: &Movie) -> AppResult<()> {
        let updated = movie.clone();
        self.modify(movie.id, move |stored| {
            stored.title = updated.title;
            stored.director = updated.director;
            stored.year = updated.year;
            stored.cast = updated.cast;
            stored.series = updated.series;
            stored.tags = updated.tags;
            stored.description = updated.description;
            stored.video_link = updated.video_link;
        })
        .await
    }

    async fn set_rating(&self, id: Uuid, rating: i32) -> AppResult<()> {
        self.modify(id, |movie| movie.rating = rating).await
    }

    async fn set_last_watched(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        self.modify(id, |movie| movie.last_watched = Some(at)).await
    }

    async fn set_similar_movies(&self, id: Uuid, titles: Vec<String>) -> AppResult<()> {
        self.modify(id, |movie| movie.similar_movies = Some(titles))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heat() -> Movie {
        Movie::new("Heat".to_string(), "Michael Mann".to_string(), 1995)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryMovieStore::new();
        let movie = heat();
        store.insert_movie(&movie).await.unwrap();

        assert_eq!(store.get_movie(movie.id).await.unwrap(), Some(movie));
        assert_eq!(store.get_movie(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let store = InMemoryMovieStore::new();
        let movie = heat();
        store.insert_movie(&movie).await.unwrap();
        assert!(matches!(
            store.insert_movie(&movie).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_title() {
        let store = InMemoryMovieStore::new();
        store.insert_movie(&heat()).await.unwrap();
        store
            .insert_movie(&Movie::new("Alien".to_string(), "Ridley Scott".to_string(), 1979))
            .await
            .unwrap();

        let titles: Vec<String> = store
            .list_movies()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["Alien", "Heat"]);
    }

    #[tokio::test]
    async fn test_update_preserves_similar_movies() {
        let store = InMemoryMovieStore::new();
        let mut movie = heat();
        store.insert_movie(&movie).await.unwrap();
        store
            .set_similar_movies(movie.id, vec!["Thief".to_string()])
            .await
            .unwrap();

        movie.tags = vec!["crime".to_string()];
        store.update_movie(&movie).await.unwrap();

        let stored = require_movie(&store, movie.id).await.unwrap();
        assert_eq!(stored.tags, vec!["crime"]);
        assert_eq!(stored.similar_movies, Some(vec!["Thief".to_string()]));
    }

    #[tokio::test]
    async fn test_update_from_stale_copy_keeps_rating_and_watch() {
        let store = InMemoryMovieStore::new();
        let movie = heat();
        store.insert_movie(&movie).await.unwrap();

        let mut edited = require_movie(&store, movie.id).await.unwrap();
        let watched_at = Utc::now();
        store.set_rating(movie.id, 5).await.unwrap();
        store.set_last_watched(movie.id, watched_at).await.unwrap();

        edited.description = vec!["A crew plans one last score.".to_string()];
        store.update_movie(&edited).await.unwrap();

        let stored = require_movie(&store, movie.id).await.unwrap();
        assert_eq!(stored.description, edited.description);
        assert_eq!(stored.rating, 5);
        assert_eq!(stored.last_watched, Some(watched_at));
    }

    #[tokio::test]
    async fn test_rating_and_watch_updates() {
        let store = InMemoryMovieStore::new();
        let movie = heat();
        store.insert_movie(&movie).await.unwrap();

        let now = Utc::now();
        store.set_rating(movie.id, 4).await.unwrap();
        store.set_last_watched(movie.id, now).await.unwrap();

        let stored = require_movie(&store, movie.id).await.unwrap();
        assert_eq!(stored.rating, 4);
        assert_eq!(stored.last_watched, Some(now));
    }

    #[tokio::test]
    async fn test_updates_on_unknown_movie_are_not_found() {
        let store = InMemoryMovieStore::new();
        let id = Uuid::new_v4();

        assert!(matches!(
            store.set_rating(id, 3).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.set_similar_movies(id, Vec::new()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            require_movie(&store, id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
