use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::error::RecommendError;
use super::vector::FeatureVector;
use super::vectorizer::{TfidfVectorizer, Transformer, VectorizerArtifact};

/// Column of the reference table holding movie titles
const TITLE_COLUMN: &str = "title";

/// Hex digits of the artifact digest that are kept
const FINGERPRINT_LEN: usize = 16;

/// Locations of the artifacts produced by the offline fitting job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// CSV reference table, one row per corpus vector
    pub titles: PathBuf,
    /// Fitted vectorizer (JSON)
    pub transformer: PathBuf,
    /// Corpus vector matrix (JSON, dense or CSR)
    pub vectors: PathBuf,
}

impl ArtifactPaths {
    /// BLAKE3 digest over the bytes of all three artifacts
    ///
    /// Any change to any of the files yields a different fingerprint.
    pub fn fingerprint(&self) -> Result<String, RecommendError> {
        let mut hasher = blake3::Hasher::new();
        for path in [&self.titles, &self.transformer, &self.vectors] {
            let file = File::open(path).map_err(|e| RecommendError::artifact(path.display(), e))?;
            let mut reader = BufReader::with_capacity(64 * 1024, file);
            let len = std::io::copy(&mut reader, &mut hasher)
                .map_err(|e| RecommendError::artifact(path.display(), e))?;
            hasher.update(&len.to_le_bytes());
        }

        let mut digest = hasher.finalize().to_hex().to_string();
        digest.truncate(FINGERPRINT_LEN);
        Ok(digest)
    }
}

/// Serialized corpus matrix
#[derive(Debug, Deserialize)]
#[serde(tag = "encoding", rename_all = "lowercase")]
enum CorpusMatrix {
    Dense {
        shape: (usize, usize),
        rows: Vec<Vec<f32>>,
    },
    /// Compressed sparse rows: row `i` owns `indices[indptr[i]..indptr[i + 1]]`
    Csr {
        shape: (usize, usize),
        indptr: Vec<usize>,
        indices: Vec<u32>,
        data: Vec<f32>,
    },
}

impl CorpusMatrix {
    fn shape(&self) -> (usize, usize) {
        match self {
            CorpusMatrix::Dense { shape, .. } | CorpusMatrix::Csr { shape, .. } => *shape,
        }
    }

    /// Expands into one vector per row, checking the structure against `shape`
    fn into_rows(self) -> Result<Vec<FeatureVector>, String> {
        match self {
            CorpusMatrix::Dense {
                shape: (n_rows, n_cols),
                rows,
            } => {
                if rows.len() != n_rows {
                    return Err(format!("shape declares {} rows, found {}", n_rows, rows.len()));
                }
                rows.iter()
                    .enumerate()
                    .map(|(i, row)| {
                        if row.len() != n_cols {
                            return Err(format!(
                                "row {} has {} columns, shape declares {}",
                                i,
                                row.len(),
                                n_cols
                            ));
                        }
                        if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                            return Err(format!("row {} has a non-finite weight at column {}", i, j));
                        }
                        Ok(FeatureVector::from_dense(row))
                    })
                    .collect()
            }
            CorpusMatrix::Csr {
                shape: (n_rows, n_cols),
                indptr,
                indices,
                data,
            } => {
                if indptr.len() != n_rows + 1 {
                    return Err(format!(
                        "indptr has {} entries for {} rows",
                        indptr.len(),
                        n_rows
                    ));
                }
                if indices.len() != data.len() {
                    return Err(format!(
                        "{} column indices for {} values",
                        indices.len(),
                        data.len()
                    ));
                }
                if let Some(p) = data.iter().position(|v| !v.is_finite()) {
                    return Err(format!("non-finite weight at stored value {}", p));
                }
                if indptr.first() != Some(&0) || indptr.last() != Some(&data.len()) {
                    return Err("indptr does not span the stored values".to_string());
                }

                indptr
                    .windows(2)
                    .enumerate()
                    .map(|(i, bounds)| {
                        let (start, end) = (bounds[0], bounds[1]);
                        if start > end || end > data.len() {
                            return Err(format!("indptr out of order at row {}", i));
                        }
                        let pairs = indices[start..end]
                            .iter()
                            .copied()
                            .zip(data[start..end].iter().copied());
                        FeatureVector::from_pairs(n_cols, pairs)
                            .map_err(|e| format!("row {}: {}", i, e))
                    })
                    .collect()
            }
        }
    }
}

/// Fitted vectorizer, corpus vectors and titles, loaded together
///
/// `corpus_vectors[i]` is the vector of `titles[i]`. Dimensions agree across
/// the vectorizer and every corpus row.
#[derive(Debug)]
pub struct CorpusArtifacts {
    pub transformer: TfidfVectorizer,
    pub corpus_vectors: Vec<FeatureVector>,
    pub titles: Vec<String>,
    /// Digest of the files these were read from
    pub fingerprint: String,
}

impl CorpusArtifacts {
    /// Reads and cross-checks all three artifacts
    ///
    /// Blocking; run it off the async executor.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, RecommendError> {
        let start = Instant::now();

        let fingerprint = paths.fingerprint()?;

        let titles = read_titles(&paths.titles)?;
        let matrix: CorpusMatrix = read_json(&paths.vectors)?;
        let (n_rows, n_cols) = matrix.shape();
        let corpus_vectors = matrix
            .into_rows()
            .map_err(|reason| RecommendError::artifact(paths.vectors.display(), reason))?;

        if n_rows != titles.len() {
            return Err(RecommendError::artifact(
                paths.vectors.display(),
                format!(
                    "corpus has {} rows but {} lists {} titles",
                    n_rows,
                    paths.titles.display(),
                    titles.len()
                ),
            ));
        }

        let artifact: VectorizerArtifact = read_json(&paths.transformer)?;
        let transformer = TfidfVectorizer::from_artifact(artifact)
            .map_err(|reason| RecommendError::artifact(paths.transformer.display(), reason))?;

        if transformer.dimension() != n_cols {
            return Err(RecommendError::DimensionMismatch {
                expected: n_cols,
                actual: transformer.dimension(),
            });
        }

        tracing::info!(
            corpus_rows = n_rows,
            dimension = n_cols,
            version = %transformer.version(),
            fingerprint = %fingerprint,
            elapsed_ms = start.elapsed().as_millis(),
            "Loaded similarity artifacts"
        );

        Ok(Self {
            transformer,
            corpus_vectors,
            titles,
            fingerprint,
        })
    }

    /// Vectorizes text into the corpus space
    pub fn transform(&self, text: &str) -> FeatureVector {
        self.transformer.transform(text)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, RecommendError> {
    let file = File::open(path).map_err(|e| RecommendError::artifact(path.display(), e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| RecommendError::artifact(path.display(), e))
}

/// Reads the `title` column in row order
fn read_titles(path: &Path) -> Result<Vec<String>, RecommendError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| RecommendError::artifact(path.display(), e))?;

    let headers = reader
        .headers()
        .map_err(|e| RecommendError::artifact(path.display(), e))?;
    let column = headers
        .iter()
        .position(|h| h.trim() == TITLE_COLUMN)
        .ok_or_else(|| RecommendError::artifact(path.display(), "missing 'title' column"))?;

    reader
        .records()
        .map(|record| {
            let record = record.map_err(|e| RecommendError::artifact(path.display(), e))?;
            Ok(record.get(column).unwrap_or_default().to_string())
        })
        .collect()
}
