use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    cached,
    db::{require_movie, Cache, CacheKey, MovieStore},
    error::{AppError, AppResult},
    services::similarity::{movie_query, ModelHandle, RecommendError, SimilarityModel},
};

/// Default TTL for cached rankings (1 hour)
const RANKING_CACHE_TTL: u64 = 3600;

/// Computes and stores "similar movie" lists
///
/// The only entry point the CRUD layer uses for recommendations. Reads the
/// movie, ranks the corpus against its text, and writes the ranked titles
/// back onto the movie record.
pub struct RecommendationService {
    movies: Arc<dyn MovieStore>,
    model: Arc<ModelHandle>,
    cache: Option<Cache>,
    cache_ttl: u64,
    ranking_timeout: Option<Duration>,
}

impl RecommendationService {
    pub fn new(movies: Arc<dyn MovieStore>, model: Arc<ModelHandle>) -> Self {
        Self {
            movies,
            model,
            cache: None,
            cache_ttl: RANKING_CACHE_TTL,
            ranking_timeout: None,
        }
    }

    /// Reuses rankings for identical query text through Redis
    pub fn with_cache(mut self, cache: Cache, ttl_secs: u64) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl_secs;
        self
    }

    /// Bounds how long a single corpus scan may take
    pub fn with_ranking_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ranking_timeout = timeout;
        self
    }

    /// Ranks the corpus against a movie and stores the top `k` titles on it
    ///
    /// Movies without a description are skipped: nothing is ranked or written
    /// and an empty list is returned. An empty corpus is handled the same way.
    /// The record is written once, after ranking succeeds.
    #[instrument(skip(self))]
    pub async fn recommend(&self, movie_id: Uuid, k: usize) -> AppResult<Vec<String>> {
        if k == 0 {
            return Err(AppError::InvalidInput(
                "recommendation count must be at least 1".to_string(),
            ));
        }

        let movie = require_movie(self.movies.as_ref(), movie_id).await?;

        let Some(query) = movie_query(&movie) else {
            tracing::info!("Movie has no description, skipping recommendation");
            return Ok(Vec::new());
        };

        let model = self.model.get().await?;

        let titles = match self.ranked_titles(model, query, k).await {
            Ok(titles) => titles,
            Err(AppError::Recommendation(RecommendError::EmptyCorpus)) => {
                tracing::warn!("Similarity corpus is empty, nothing to recommend");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        self.movies
            .set_similar_movies(movie_id, titles.clone())
            .await?;

        tracing::info!(count = titles.len(), "Stored similar movies");

        Ok(titles)
    }

    async fn ranked_titles(
        &self,
        model: Arc<SimilarityModel>,
        query: String,
        k: usize,
    ) -> AppResult<Vec<String>> {
        match &self.cache {
            Some(cache) => {
                let key = CacheKey::similar_titles(model.version(), &query, k);
                cached!(cache, key, self.cache_ttl, self.rank(model, query, k))
            }
            None => self.rank(model, query, k).await,
        }
    }

    /// Runs the corpus scan on the blocking pool, within the configured budget
    async fn rank(
        &self,
        model: Arc<SimilarityModel>,
        query: String,
        k: usize,
    ) -> AppResult<Vec<String>> {
        let start = Instant::now();
        let corpus_rows = model.corpus_len();
        let task = tokio::task::spawn_blocking(move || model.rank(&query, k));

        // On timeout the scan keeps running to completion; only the wait is abandoned.
        let joined = match self.ranking_timeout {
            Some(budget) => tokio::time::timeout(budget, task)
                .await
                .map_err(|_| RecommendError::RankingTimeout(budget))?,
            None => task.await,
        };

        let ranked = joined
            .map_err(|e| AppError::Internal(format!("Ranking task failed: {}", e)))??;

        tracing::debug!(
            corpus_rows,
            k,
            elapsed_ms = start.elapsed().as_millis(),
            top_score = ranked.first().map(|r| r.score),
            "Ranked corpus"
        );

        Ok(ranked.into_iter().map(|r| r.title).collect())
    }
}
