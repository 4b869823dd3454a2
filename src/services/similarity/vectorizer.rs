use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

use super::vector::FeatureVector;

/// Fitted mapping from raw text to a fixed-dimension vector
///
/// Implementations are immutable after construction and shared across requests.
pub trait Transformer: Send + Sync {
    /// Width of every vector this transformer produces
    fn dimension(&self) -> usize;

    /// Identifies the fitted artifact, used to scope cached rankings
    fn version(&self) -> &str;

    fn transform(&self, text: &str) -> FeatureVector;
}

/// Row normalization applied after weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

/// On-disk form of a fitted TF-IDF (or plain count) vectorizer
#[derive(Debug, Clone, Deserialize)]
pub struct VectorizerArtifact {
    #[serde(default = "default_version")]
    pub version: String,
    pub vocabulary: HashMap<String, u32>,
    /// Inverse document frequencies, one per column. Absent for count vectorizers.
    #[serde(default)]
    pub idf: Option<Vec<f32>>,
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub stop_words: Vec<String>,
    #[serde(default)]
    pub binary: bool,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default = "default_norm")]
    pub norm: Option<Norm>,
}

fn default_version() -> String {
    "unversioned".to_string()
}

fn default_lowercase() -> bool {
    true
}

fn default_token_pattern() -> String {
    r"(?u)\b\w\w+\b".to_string()
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// Bag-of-words vectorizer with optional IDF weighting
#[derive(Debug)]
pub struct TfidfVectorizer {
    version: String,
    vocabulary: HashMap<String, u32>,
    idf: Option<Vec<f32>>,
    lowercase: bool,
    token_pattern: Regex,
    ngram_range: (usize, usize),
    stop_words: HashSet<String>,
    binary: bool,
    sublinear_tf: bool,
    norm: Option<Norm>,
}

impl TfidfVectorizer {
    /// Validates a deserialized artifact and compiles it for use
    pub fn from_artifact(artifact: VectorizerArtifact) -> Result<Self, String> {
        let dimension = artifact.vocabulary.len();

        let mut seen = vec![false; dimension];
        for (term, &column) in &artifact.vocabulary {
            let slot = seen.get_mut(column as usize).ok_or_else(|| {
                format!(
                    "term '{}' maps to column {} outside vocabulary of {}",
                    term, column, dimension
                )
            })?;
            if *slot {
                return Err(format!("column {} assigned to more than one term", column));
            }
            *slot = true;
        }

        if let Some(idf) = &artifact.idf {
            if idf.len() != dimension {
                return Err(format!(
                    "idf has {} weights for a vocabulary of {}",
                    idf.len(),
                    dimension
                ));
            }
            if idf.iter().any(|w| !w.is_finite()) {
                return Err("idf contains non-finite weights".to_string());
            }
        }

        let (min_n, max_n) = artifact.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("invalid ngram range ({}, {})", min_n, max_n));
        }

        let token_pattern = Regex::new(&artifact.token_pattern)
            .map_err(|e| format!("invalid token pattern: {}", e))?;

        Ok(Self {
            version: artifact.version,
            vocabulary: artifact.vocabulary,
            idf: artifact.idf,
            lowercase: artifact.lowercase,
            token_pattern,
            ngram_range: artifact.ngram_range,
            stop_words: artifact.stop_words.into_iter().collect(),
            binary: artifact.binary,
            sublinear_tf: artifact.sublinear_tf,
            norm: artifact.norm,
        })
    }

    /// Splits text into the terms the vocabulary is keyed by
    ///
    /// Tokens are matched by the token pattern, stop words removed, and word
    /// n-grams in the configured range joined with single spaces.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        let tokens: Vec<&str> = self
            .token_pattern
            .find_iter(&text)
            .map(|m| m.as_str())
            .filter(|token| !self.stop_words.contains(*token))
            .collect();

        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            terms.extend(tokens.windows(n).map(|window| window.join(" ")));
        }
        terms
    }
}

impl Transformer for TfidfVectorizer {
    fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn transform(&self, text: &str) -> FeatureVector {
        let dimension = self.dimension();

        let mut counts: HashMap<u32, f32> = HashMap::new();
        for term in self.analyze(text) {
            if let Some(&column) = self.vocabulary.get(&term) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        // Columns come from the validated vocabulary, so construction cannot fail.
        let mut vector = FeatureVector::from_pairs(dimension, counts)
            .unwrap_or_else(|_| FeatureVector::zeros(dimension));

        if self.binary {
            vector.map_values(|_, _| 1.0);
        }
        if self.sublinear_tf {
            vector.map_values(|_, tf| 1.0 + tf.ln());
        }
        if let Some(idf) = &self.idf {
            vector.map_values(|column, tf| tf * idf[column as usize]);
        }

        let scale = match self.norm {
            Some(Norm::L2) => vector.norm(),
            Some(Norm::L1) => vector.iter().map(|(_, v)| f64::from(v.abs())).sum(),
            None => 0.0,
        };
        if scale > 0.0 {
            vector.scale((1.0 / scale) as f32);
        }

        vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(terms: &[&str]) -> VectorizerArtifact {
        serde_json::from_value(serde_json::json!({
            "vocabulary": terms
                .iter()
                .enumerate()
                .map(|(i, t)| (t.to_string(), i as u32))
                .collect::<HashMap<_, _>>(),
        }))
        .unwrap()
    }

    #[test]
    fn test_artifact_defaults() {
        let a = artifact(&["space"]);
        assert_eq!(a.version, "unversioned");
        assert!(a.lowercase);
        assert_eq!(a.ngram_range, (1, 1));
        assert_eq!(a.norm, Some(Norm::L2));
        assert!(a.idf.is_none());
    }

    #[test]
    fn test_null_norm_disables_normalization() {
        let a: VectorizerArtifact = serde_json::from_value(serde_json::json!({
            "vocabulary": {"heist": 0},
            "norm": null
        }))
        .unwrap();
        assert_eq!(a.norm, None);

        let v = TfidfVectorizer::from_artifact(a).unwrap();
        let out = v.transform("heist heist heist");
        assert_eq!(out.iter().collect::<Vec<_>>(), vec![(0, 3.0)]);
    }

    #[test]
    fn test_analyze_lowercases_and_drops_single_characters() {
        let v = TfidfVectorizer::from_artifact(artifact(&["space"])).unwrap();
        assert_eq!(
            v.analyze("A Space Odyssey, 2001!"),
            vec!["space", "odyssey", "2001"]
        );
    }

    #[test]
    fn test_analyze_removes_stop_words_and_builds_ngrams() {
        let mut a = artifact(&["dark knight"]);
        a.stop_words = vec!["the".to_string()];
        a.ngram_range = (1, 2);
        let v = TfidfVectorizer::from_artifact(a).unwrap();

        assert_eq!(
            v.analyze("The Dark Knight"),
            vec!["dark", "knight", "dark knight"]
        );
    }

    #[test]
    fn test_transform_is_l2_normalized() {
        let v = TfidfVectorizer::from_artifact(artifact(&["space", "heist", "dream"])).unwrap();
        let out = v.transform("dream heist dream unknownword");

        assert_eq!(out.dimension(), 3);
        assert!((out.norm() - 1.0).abs() < 1e-6);
        let weights: HashMap<u32, f32> = out.iter().collect();
        assert!(weights[&2] > weights[&1]);
        assert!(!weights.contains_key(&0));
    }

    #[test]
    fn test_transform_applies_idf() {
        let mut a = artifact(&["common", "rare"]);
        a.idf = Some(vec![1.0, 3.0]);
        a.norm = None;
        let v = TfidfVectorizer::from_artifact(a).unwrap();

        let out = v.transform("common rare");
        assert_eq!(out.iter().collect::<Vec<_>>(), vec![(0, 1.0), (1, 3.0)]);
    }

    #[test]
    fn test_transform_sublinear_and_binary() {
        let mut a = artifact(&["noir"]);
        a.norm = None;
        a.sublinear_tf = true;
        let sublinear = TfidfVectorizer::from_artifact(a.clone()).unwrap();
        let weight = sublinear.transform("noir noir noir").iter().next().unwrap().1;
        assert!((weight - (1.0 + 3.0_f32.ln())).abs() < 1e-6);

        a.sublinear_tf = false;
        a.binary = true;
        let binary = TfidfVectorizer::from_artifact(a).unwrap();
        assert_eq!(binary.transform("noir noir").iter().next().unwrap().1, 1.0);
    }

    #[test]
    fn test_transform_of_unknown_text_is_zero() {
        let v = TfidfVectorizer::from_artifact(artifact(&["space"])).unwrap();
        let out = v.transform("nothing matches here");
        assert!(out.is_zero());
        assert_eq!(out.dimension(), 1);
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let a: VectorizerArtifact = serde_json::from_value(serde_json::json!({
            "vocabulary": {"a1": 0, "b2": 0}
        }))
        .unwrap();
        assert!(TfidfVectorizer::from_artifact(a).is_err());
    }

    #[test]
    fn test_rejects_sparse_columns() {
        let a: VectorizerArtifact = serde_json::from_value(serde_json::json!({
            "vocabulary": {"a1": 0, "b2": 5}
        }))
        .unwrap();
        assert!(TfidfVectorizer::from_artifact(a).is_err());
    }

    #[test]
    fn test_rejects_idf_length_mismatch() {
        let mut a = artifact(&["space", "heist"]);
        a.idf = Some(vec![1.0]);
        assert!(TfidfVectorizer::from_artifact(a).is_err());
    }

    #[test]
    fn test_rejects_bad_ngram_range() {
        let mut a = artifact(&["space"]);
        a.ngram_range = (2, 1);
        assert!(TfidfVectorizer::from_artifact(a).is_err());
    }
}
