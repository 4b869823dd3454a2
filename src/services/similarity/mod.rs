//! Content-based "similar movie" lookup
//!
//! A fitted vectorizer maps a movie's text into the same space as a
//! precomputed corpus of reference movies; the closest corpus rows by cosine
//! similarity are the recommendations. Fitting happens offline; this module
//! only loads the resulting artifacts and ranks against them.

pub mod artifacts;
pub mod error;
pub mod features;
pub mod handle;
pub mod index;
pub mod model;
pub mod vector;
pub mod vectorizer;

pub use artifacts::{ArtifactPaths, CorpusArtifacts};
pub use error::RecommendError;
pub use features::{compose_query, has_description, movie_query};
pub use handle::ModelHandle;
pub use index::{LinearScanIndex, Neighbor, NeighborIndex};
pub use model::{RankedTitle, SimilarityModel, DEFAULT_RECOMMENDATION_COUNT};
pub use vector::{cosine_similarity, FeatureVector};
pub use vectorizer::{Norm, TfidfVectorizer, Transformer, VectorizerArtifact};
