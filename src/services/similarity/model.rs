use std::collections::HashSet;

use super::artifacts::CorpusArtifacts;
use super::error::RecommendError;
use super::index::{LinearScanIndex, NeighborIndex};
use super::vector::FeatureVector;
use super::vectorizer::Transformer;

/// Number of similar titles returned when no count is given
pub const DEFAULT_RECOMMENDATION_COUNT: usize = 5;

/// A corpus title with its similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTitle {
    pub title: String,
    pub score: f32,
}

/// Loaded, read-only similarity model: vectorizer, corpus index and titles
///
/// Shared across requests behind an `Arc`; nothing mutates it after construction.
pub struct SimilarityModel {
    transformer: Box<dyn Transformer>,
    index: Box<dyn NeighborIndex>,
    titles: Vec<String>,
    version: String,
    /// Some title appears on more than one corpus row
    repeated_titles: bool,
}

impl std::fmt::Debug for SimilarityModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityModel")
            .field("version", &self.version)
            .field("dimension", &self.index.dimension())
            .field("corpus_rows", &self.titles.len())
            .finish()
    }
}

impl SimilarityModel {
    /// Assembles a model, checking that its parts agree
    pub fn new(
        transformer: Box<dyn Transformer>,
        index: Box<dyn NeighborIndex>,
        titles: Vec<String>,
    ) -> Result<Self, RecommendError> {
        if titles.len() != index.len() {
            return Err(RecommendError::artifact(
                "title list",
                format!(
                    "{} titles for {} corpus vectors",
                    titles.len(),
                    index.len()
                ),
            ));
        }
        if transformer.dimension() != index.dimension() {
            return Err(RecommendError::DimensionMismatch {
                expected: index.dimension(),
                actual: transformer.dimension(),
            });
        }

        let repeated_titles = {
            let mut seen = HashSet::with_capacity(titles.len());
            !titles.iter().all(|title| seen.insert(title.as_str()))
        };
        if repeated_titles {
            tracing::warn!("Corpus lists some titles more than once, rankings keep the best row per title");
        }

        Ok(Self {
            version: transformer.version().to_string(),
            transformer,
            index,
            titles,
            repeated_titles,
        })
    }

    /// Builds the exact linear-scan model over loaded artifacts
    ///
    /// The version combines the vectorizer's own version with the artifact
    /// fingerprint, so replacing any artifact file changes it.
    pub fn from_artifacts(artifacts: CorpusArtifacts) -> Result<Self, RecommendError> {
        let dimension = artifacts.transformer.dimension();
        let version = format!(
            "{}+{}",
            artifacts.transformer.version(),
            artifacts.fingerprint
        );
        let index = LinearScanIndex::new(dimension, artifacts.corpus_vectors)?;
        let mut model = Self::new(
            Box::new(artifacts.transformer),
            Box::new(index),
            artifacts.titles,
        )?;
        model.version = version;
        Ok(model)
    }

    /// Identifies the loaded artifact set, used to scope cached rankings
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn corpus_len(&self) -> usize {
        self.titles.len()
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// Vectorizes query text into the corpus space
    pub fn transform(&self, text: &str) -> FeatureVector {
        self.transformer.transform(text)
    }

    /// Top `k` corpus titles most similar to `query`, best first
    pub fn rank(&self, query: &str, k: usize) -> Result<Vec<RankedTitle>, RecommendError> {
        let vector = self.transform(query);
        if vector.is_zero() {
            tracing::debug!("Query shares no terms with the vectorizer vocabulary");
        }
        self.rank_vector(&vector, k)
    }

    /// Top `k` corpus titles most similar to an already vectorized query
    ///
    /// A title listed on several rows is returned once, at its best rank.
    pub fn rank_vector(
        &self,
        query: &FeatureVector,
        k: usize,
    ) -> Result<Vec<RankedTitle>, RecommendError> {
        if !self.repeated_titles {
            let neighbors = self.index.nearest(query, k)?;
            return Ok(neighbors
                .into_iter()
                .map(|neighbor| RankedTitle {
                    title: self.titles[neighbor.row].clone(),
                    score: neighbor.score,
                })
                .collect());
        }

        let neighbors = self.index.nearest(query, self.index.len())?;
        let mut seen = HashSet::with_capacity(k);
        Ok(neighbors
            .into_iter()
            .filter(|neighbor| seen.insert(self.titles[neighbor.row].as_str()))
            .take(k)
            .map(|neighbor| RankedTitle {
                title: self.titles[neighbor.row].clone(),
                score: neighbor.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::similarity::artifacts::tests::{
        write_artifacts, DENSE_VECTORS_JSON, TITLES_CSV, VECTORIZER_JSON,
    };
    use std::collections::HashSet;

    /// Maps text to a fixed vector regardless of input
    struct FixedTransformer(FeatureVector);

    impl Transformer for FixedTransformer {
        fn dimension(&self) -> usize {
            self.0.dimension()
        }

        fn version(&self) -> &str {
            "fixed"
        }

        fn transform(&self, _text: &str) -> FeatureVector {
            self.0.clone()
        }
    }

    fn abc_model(query: &[f32]) -> SimilarityModel {
        let index =
            LinearScanIndex::from_dense(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
        SimilarityModel::new(
            Box::new(FixedTransformer(FeatureVector::from_dense(query))),
            Box::new(index),
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
        )
        .unwrap()
    }

    fn titles(ranked: &[RankedTitle]) -> Vec<&str> {
        ranked.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_rank_top_two() {
        let model = abc_model(&[1.0, 0.0]);
        let ranked = model.rank("anything", 2).unwrap();
        assert_eq!(titles(&ranked), vec!["A", "C"]);
    }

    #[test]
    fn test_rank_returns_whole_corpus_when_smaller_than_k() {
        let model = abc_model(&[1.0, 0.0]);
        let ranked = model.rank("anything", DEFAULT_RECOMMENDATION_COUNT).unwrap();
        assert_eq!(titles(&ranked), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_rank_vector_dimension_mismatch() {
        let model = abc_model(&[1.0, 0.0]);
        let err = model
            .rank_vector(&FeatureVector::from_dense(&[1.0, 0.0, 0.0]), 2)
            .unwrap_err();
        assert!(matches!(
            err,
            RecommendError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_rank_empty_corpus() {
        let model = SimilarityModel::new(
            Box::new(FixedTransformer(FeatureVector::from_dense(&[1.0, 0.0]))),
            Box::new(LinearScanIndex::new(2, Vec::new()).unwrap()),
            Vec::new(),
        )
        .unwrap();
        assert!(matches!(
            model.rank("anything", 5),
            Err(RecommendError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_new_rejects_transformer_of_other_dimension() {
        let index = LinearScanIndex::from_dense(&[vec![1.0, 0.0]]).unwrap();
        let err = SimilarityModel::new(
            Box::new(FixedTransformer(FeatureVector::zeros(3))),
            Box::new(index),
            vec!["A".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, RecommendError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_new_rejects_title_count_mismatch() {
        let index = LinearScanIndex::from_dense(&[vec![1.0, 0.0]]).unwrap();
        let err = SimilarityModel::new(
            Box::new(FixedTransformer(FeatureVector::zeros(2))),
            Box::new(index),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, RecommendError::ArtifactLoad { .. }));
    }

    #[test]
    fn test_repeated_titles_are_returned_once() {
        let index = LinearScanIndex::from_dense(&[
            vec![0.0, 1.0],
            vec![0.1, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ])
        .unwrap();
        let model = SimilarityModel::new(
            Box::new(FixedTransformer(FeatureVector::from_dense(&[0.0, 1.0]))),
            Box::new(index),
            vec![
                "Heat".to_string(),
                "Heat".to_string(),
                "Alien".to_string(),
                "Thief".to_string(),
            ],
        )
        .unwrap();

        let ranked = model.rank("heist", 2).unwrap();
        assert_eq!(titles(&ranked), vec!["Heat", "Thief"]);
        assert!((ranked[0].score - 1.0).abs() < 1e-6);

        let ranked = model.rank("heist", 10).unwrap();
        assert_eq!(titles(&ranked), vec!["Heat", "Thief", "Alien"]);
    }

    #[test]
    fn test_version_reflects_artifact_files() {
        let (_dir, paths) = write_artifacts(TITLES_CSV, VECTORIZER_JSON, DENSE_VECTORS_JSON);
        let load = || SimilarityModel::from_artifacts(CorpusArtifacts::load(&paths).unwrap()).unwrap();

        let before = load();
        assert!(before.version().starts_with("test-1+"));

        std::fs::write(
            &paths.vectors,
            r#"{"encoding": "dense", "shape": [3, 3], "rows": [[0.0, 0.0, 1.0], [0.8, 0.6, 0.0], [0.0, 1.0, 0.0]]}"#,
        )
        .unwrap();
        let after = load();
        assert_ne!(after.version(), before.version());
    }

    #[test]
    fn test_rank_from_loaded_artifacts() {
        let (_dir, paths) = write_artifacts(TITLES_CSV, VECTORIZER_JSON, DENSE_VECTORS_JSON);
        let model =
            SimilarityModel::from_artifacts(CorpusArtifacts::load(&paths).unwrap()).unwrap();

        let ranked = model
            .rank("A heist planned inside a dream", 3)
            .unwrap();
        assert_eq!(ranked[0].title, "Inception");

        let ranked = model.rank("Swordplay: a sword duel", 1).unwrap();
        assert_eq!(titles(&ranked), vec!["Crouching Tiger, Hidden Dragon"]);
        assert!((ranked[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rank_is_deterministic_with_unique_titles() {
        let (_dir, paths) = write_artifacts(TITLES_CSV, VECTORIZER_JSON, DENSE_VECTORS_JSON);
        let model =
            SimilarityModel::from_artifacts(CorpusArtifacts::load(&paths).unwrap()).unwrap();

        let query = "dream heist sword";
        let first = model.rank(query, 2).unwrap();
        for _ in 0..10 {
            assert_eq!(model.rank(query, 2).unwrap(), first);
        }

        let unique: HashSet<&str> = titles(&first).into_iter().collect();
        assert_eq!(unique.len(), first.len());
        assert!(first.iter().all(|r| model.titles().contains(&r.title)));
        assert!(first.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
