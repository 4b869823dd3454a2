/// Sparse feature vector: sorted, unique column indices with their weights
///
/// Text-frequency vectors are mostly zeros, so only populated columns are kept.
/// `dimension` is the full width of the vector space the vector lives in.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    dimension: usize,
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl FeatureVector {
    /// Builds a vector from `(column, weight)` pairs
    ///
    /// Pairs may arrive in any order; duplicate columns are summed and zero
    /// weights are dropped. Columns at or beyond `dimension` are rejected.
    pub fn from_pairs(
        dimension: usize,
        pairs: impl IntoIterator<Item = (u32, f32)>,
    ) -> Result<Self, String> {
        let mut pairs: Vec<(u32, f32)> = pairs.into_iter().collect();
        pairs.sort_by_key(|(column, _)| *column);

        let mut indices: Vec<u32> = Vec::with_capacity(pairs.len());
        let mut values: Vec<f32> = Vec::with_capacity(pairs.len());

        for (column, value) in pairs {
            if column as usize >= dimension {
                return Err(format!(
                    "column {} out of range for dimension {}",
                    column, dimension
                ));
            }
            match indices.last() {
                Some(&last) if last == column => {
                    if let Some(v) = values.last_mut() {
                        *v += value;
                    }
                }
                _ => {
                    indices.push(column);
                    values.push(value);
                }
            }
        }

        let mut vector = Self {
            dimension,
            indices,
            values,
        };
        vector.drop_zeros();
        Ok(vector)
    }

    /// Builds a vector from a dense row of weights
    pub fn from_dense(row: &[f32]) -> Self {
        let (indices, values) = row
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, v)| (i as u32, *v))
            .unzip();

        Self {
            dimension: row.len(),
            indices,
            values,
        }
    }

    /// Zero vector of the given dimension
    pub fn zeros(dimension: usize) -> Self {
        Self {
            dimension,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of populated columns
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    /// Iterates populated `(column, weight)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        self.values
            .iter()
            .map(|v| f64::from(*v) * f64::from(*v))
            .sum::<f64>()
            .sqrt()
    }

    /// Dot product over the shared columns
    pub fn dot(&self, other: &FeatureVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0_f64;

        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += f64::from(self.values[i]) * f64::from(other.values[j]);
                    i += 1;
                    j += 1;
                }
            }
        }

        sum
    }

    /// Scales every weight in place
    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.values {
            *v *= factor;
        }
    }

    /// Applies `f` to every populated weight
    pub fn map_values(&mut self, f: impl Fn(u32, f32) -> f32) {
        for (column, value) in self.indices.iter().zip(self.values.iter_mut()) {
            *value = f(*column, *value);
        }
        self.drop_zeros();
    }

    fn drop_zeros(&mut self) {
        if self.values.iter().all(|v| *v != 0.0) {
            return;
        }
        let (indices, values) = self
            .indices
            .iter()
            .zip(self.values.iter())
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, v)| (*i, *v))
            .unzip();
        self.indices = indices;
        self.values = values;
    }
}

/// Cosine similarity between two vectors of the same space
///
/// Defined as 0 when either vector has zero norm. Callers are expected to have
/// checked that both dimensions agree.
pub fn cosine_similarity(a: &FeatureVector, b: &FeatureVector) -> f32 {
    cosine_with_norms(a, a.norm(), b, b.norm())
}

/// Cosine similarity with precomputed norms, used by the corpus scan
pub(crate) fn cosine_with_norms(a: &FeatureVector, a_norm: f64, b: &FeatureVector, b_norm: f64) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    (a.dot(b) / (a_norm * b_norm)) as f32
}
