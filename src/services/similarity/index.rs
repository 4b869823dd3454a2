use std::cmp::Ordering;

use super::error::RecommendError;
use super::vector::{cosine_with_norms, FeatureVector};

/// A corpus row matched against a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the row in the corpus
    pub row: usize,
    /// Cosine similarity to the query
    pub score: f32,
}

/// Nearest-neighbor lookup over a fixed set of corpus vectors
///
/// The recommendation flow depends only on this trait, so an approximate index
/// can stand in for the exact scan without changing callers. Implementations
/// must return neighbors by descending score with ties in corpus order.
pub trait NeighborIndex: Send + Sync {
    /// Column count shared by every indexed vector
    fn dimension(&self) -> usize;

    /// Number of indexed rows
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns up to `k` rows most similar to `query`
    fn nearest(&self, query: &FeatureVector, k: usize) -> Result<Vec<Neighbor>, RecommendError>;
}

/// Exact index: scores every row on every query
///
/// O(rows × populated columns) per lookup.
#[derive(Debug)]
pub struct LinearScanIndex {
    dimension: usize,
    rows: Vec<FeatureVector>,
    norms: Vec<f64>,
}

impl LinearScanIndex {
    /// Indexes `rows`, all of which must have `dimension` columns
    pub fn new(dimension: usize, rows: Vec<FeatureVector>) -> Result<Self, RecommendError> {
        if let Some(row) = rows.iter().find(|row| row.dimension() != dimension) {
            return Err(RecommendError::DimensionMismatch {
                expected: dimension,
                actual: row.dimension(),
            });
        }

        let norms = rows.iter().map(FeatureVector::norm).collect();

        Ok(Self {
            dimension,
            rows,
            norms,
        })
    }

    /// Builds an index from dense rows, taking the dimension from the first row
    pub fn from_dense(rows: &[Vec<f32>]) -> Result<Self, RecommendError> {
        let dimension = rows.first().map(Vec::len).unwrap_or(0);
        let rows = rows.iter().map(|row| FeatureVector::from_dense(row)).collect();
        Self::new(dimension, rows)
    }
}

/// Descending score, then ascending row
fn by_rank(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.score.total_cmp(&a.score).then(a.row.cmp(&b.row))
}

impl NeighborIndex for LinearScanIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn nearest(&self, query: &FeatureVector, k: usize) -> Result<Vec<Neighbor>, RecommendError> {
        if self.rows.is_empty() {
            return Err(RecommendError::EmptyCorpus);
        }
        if query.dimension() != self.dimension {
            return Err(RecommendError::DimensionMismatch {
                expected: self.dimension,
                actual: query.dimension(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_norm = query.norm();
        let mut scored: Vec<Neighbor> = self
            .rows
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(row, (vector, norm))| Neighbor {
                row,
                score: cosine_with_norms(query, query_norm, vector, *norm),
            })
            .collect();

        // The (score, row) key is total, so partial selection keeps the tie order.
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_rank);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_rank);

        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> LinearScanIndex {
        LinearScanIndex::from_dense(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap()
    }

    fn rows(neighbors: &[Neighbor]) -> Vec<usize> {
        neighbors.iter().map(|n| n.row).collect()
    }

    #[test]
    fn test_nearest_orders_by_cosine() {
        let index = corpus();
        let query = FeatureVector::from_dense(&[1.0, 0.0]);

        let result = index.nearest(&query, 2).unwrap();
        assert_eq!(rows(&result), vec![0, 2]);
        assert!((result[0].score - 1.0).abs() < 1e-6);
        assert!((result[1].score - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_returns_everything_when_k_exceeds_corpus() {
        let index = corpus();
        let query = FeatureVector::from_dense(&[1.0, 0.0]);

        let result = index.nearest(&query, 10).unwrap();
        assert_eq!(rows(&result), vec![0, 2, 1]);
        assert_eq!(result[2].score, 0.0);
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let index = LinearScanIndex::from_dense(&[
            vec![0.0, 1.0],
            vec![2.0, 0.0],
            vec![0.0, 3.0],
            vec![1.0, 0.0],
            vec![5.0, 0.0],
        ])
        .unwrap();
        let query = FeatureVector::from_dense(&[1.0, 0.0]);

        assert_eq!(rows(&index.nearest(&query, 2).unwrap()), vec![1, 3]);
        assert_eq!(rows(&index.nearest(&query, 5).unwrap()), vec![1, 3, 4, 0, 2]);
    }

    #[test]
    fn test_scores_are_non_increasing() {
        let index = LinearScanIndex::from_dense(&[
            vec![0.2, 0.9, 0.1],
            vec![0.7, 0.1, 0.4],
            vec![0.0, 0.0, 1.0],
            vec![0.5, 0.5, 0.5],
            vec![0.9, 0.0, 0.0],
        ])
        .unwrap();
        let query = FeatureVector::from_dense(&[0.6, 0.2, 0.3]);

        let result = index.nearest(&query, 4).unwrap();
        assert_eq!(result.len(), 4);
        assert!(result.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_zero_query_scores_everything_zero_in_corpus_order() {
        let index = corpus();
        let result = index.nearest(&FeatureVector::zeros(2), 3).unwrap();
        assert_eq!(rows(&result), vec![0, 1, 2]);
        assert!(result.iter().all(|n| n.score == 0.0));
    }

    #[test]
    fn test_empty_corpus_fails() {
        let index = LinearScanIndex::new(2, Vec::new()).unwrap();
        let err = index
            .nearest(&FeatureVector::from_dense(&[1.0, 0.0]), 5)
            .unwrap_err();
        assert!(matches!(err, RecommendError::EmptyCorpus));
    }

    #[test]
    fn test_query_dimension_mismatch_fails() {
        let index = corpus();
        let err = index
            .nearest(&FeatureVector::from_dense(&[1.0, 0.0, 0.0]), 2)
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
    fn test_rows_must_share_dimension() {
        let err = LinearScanIndex::from_dense(&[vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, RecommendError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_k_zero_is_empty() {
        let index = corpus();
        let result = index.nearest(&FeatureVector::from_dense(&[1.0, 1.0]), 0).unwrap();
        assert!(result.is_empty());
    }
}
