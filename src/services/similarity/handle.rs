use std::sync::Arc;
use tokio::sync::OnceCell;

use super::artifacts::{ArtifactPaths, CorpusArtifacts};
use super::error::RecommendError;
use super::model::SimilarityModel;

/// Process-wide, load-once access to the similarity model
///
/// The first caller deserializes the artifacts on the blocking pool while
/// concurrent callers wait on the same initialization. A failed load is
/// reported to its waiters and retried by the next caller.
pub struct ModelHandle {
    paths: Option<ArtifactPaths>,
    model: OnceCell<Arc<SimilarityModel>>,
}

impl ModelHandle {
    /// Handle that loads from `paths` on first use
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths: Some(paths),
            model: OnceCell::new(),
        }
    }

    /// Handle around an already built model
    pub fn preloaded(model: SimilarityModel) -> Self {
        Self {
            paths: None,
            model: OnceCell::from(Arc::new(model)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Returns the model, loading it if no caller has yet
    pub async fn get(&self) -> Result<Arc<SimilarityModel>, RecommendError> {
        self.model
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }

    async fn load(&self) -> Result<Arc<SimilarityModel>, RecommendError> {
        let paths = self.paths.clone().ok_or_else(|| {
            RecommendError::artifact("similarity model", "no artifact paths configured")
        })?;

        tracing::info!(
            titles = %paths.titles.display(),
            transformer = %paths.transformer.display(),
            vectors = %paths.vectors.display(),
            "Loading similarity artifacts"
        );

        let model = tokio::task::spawn_blocking(move || {
            CorpusArtifacts::load(&paths).and_then(SimilarityModel::from_artifacts)
        })
        .await
        .map_err(|e| RecommendError::artifact("similarity model", e))?;

        match model {
            Ok(model) => Ok(Arc::new(model)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load similarity artifacts");
                Err(e)
            }
        }
    }
}
