use std::fmt::Display;
use std::time::Duration;

/// Failures of the similarity core
#[derive(thiserror::Error, Debug)]
pub enum RecommendError {
    /// An artifact is missing, unreadable, corrupt, or inconsistent with the others
    #[error("failed to load {artifact}: {reason}")]
    ArtifactLoad { artifact: String, reason: String },

    /// The vectorizer and the corpus were not fitted together
    #[error("dimension mismatch: corpus vectors have {expected} columns, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("corpus has no reference movies")]
    EmptyCorpus,

    #[error("similarity ranking exceeded its {0:?} budget")]
    RankingTimeout(Duration),
}

impl RecommendError {
    pub(crate) fn artifact(artifact: impl Display, reason: impl Display) -> Self {
        RecommendError::ArtifactLoad {
            artifact: artifact.to_string(),
            reason: reason.to_string(),
        }
    }
}
