use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A movie on the watchlist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub director: String,
    pub year: i32,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default)]
    pub series: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free text, one entry per line or paragraph
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub video_link: Option<String>,
    #[serde(default)]
    pub rating: i32,
    #[serde(default)]
    pub last_watched: Option<DateTime<Utc>>,
    /// Most similar corpus titles, best first. Unset until first computed.
    #[serde(default)]
    pub similar_movies: Option<Vec<String>>,
}

impl Movie {
    /// Creates a movie with only the basic fields filled in
    pub fn new(title: String, director: String, year: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            director,
            year,
            cast: Vec::new(),
            series: Vec::new(),
            tags: Vec::new(),
            description: Vec::new(),
            video_link: None,
            rating: 0,
            last_watched: None,
            similar_movies: None,
        }
    }

    /// Replaces the editable fields, leaving ratings, watch history and
    /// recommendations alone
    pub fn apply_update(&mut self, update: UpdateMovieRequest) {
        self.title = update.title;
        self.director = update.director;
        self.year = update.year;
        self.cast = update.cast;
        self.series = update.series;
        self.tags = update.tags;
        self.description = update.description;
        self.video_link = update.video_link;
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMovieRequest {
    pub title: String,
    pub director: String,
    pub year: i32,
}

/// Full edit of a movie's metadata
#[derive(Debug, Deserialize)]
pub struct UpdateMovieRequest {
    pub title: String,
    pub director: String,
    pub year: i32,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default)]
    pub series: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub video_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RateMovieRequest {
    pub rating: i32,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResponse {
    pub movie_id: Uuid,
    pub similar_movies: Vec<String>,
}
