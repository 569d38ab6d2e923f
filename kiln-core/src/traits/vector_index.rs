//! Vector index traits.
//!
//! A vector index stores fixed-width embeddings under integer handles,
//! keeps one metadata record per handle, and answers k-nearest-neighbour
//! queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Metadata, Result, SearchHit};

/// Stores embeddings with metadata and performs similarity search.
///
/// Handles are assigned sequentially starting at zero, in insertion order.
#[async_trait]
pub trait VectorIndex: Send + Sync + std::fmt::Debug {
    /// Prepare the index for vectors of `dimension` elements.
    ///
    /// Persistent implementations read existing data here; the stored
    /// dimension must then equal `dimension`.
    async fn load(&self, dimension: usize) -> Result<()>;

    /// Add vectors with one metadata record each.
    ///
    /// # Returns
    ///
    /// The handles assigned to the vectors, in input order.
    ///
    /// # Errors
    ///
    /// Fails if the index is not loaded, if `vectors` and `metadata`
    /// differ in length, or if any vector has the wrong dimension.
    async fn add(&self, vectors: Vec<Vec<f32>>, metadata: Vec<Metadata>) -> Result<Vec<u64>>;

    /// Search for the `k` nearest neighbours of every query vector.
    ///
    /// Each inner vector is sorted by descending score.
    async fn search(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<Vec<SearchHit>>>;

    /// Search with a single query vector.
    async fn search_one(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let mut results = self.search(&[query.to_vec()], k).await?;
        Ok(results.pop().unwrap_or_default())
    }

    /// Fetch the metadata stored under `id`, or `None` if it is unknown.
    async fn get(&self, id: u64) -> Result<Option<Metadata>>;

    /// Number of stored vectors.
    async fn count(&self) -> Result<usize>;

    /// Dimension of the index, or `None` before `load`.
    fn dimension(&self) -> Option<usize>;

    /// Persist the current state. In-memory implementations do nothing.
    async fn save(&self) -> Result<()> {
        Ok(())
    }

    /// Remove all vectors and metadata.
    async fn clear(&self) -> Result<()>;

    /// Get a human-readable name for this index.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Distance metrics for vector similarity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine similarity.
    #[default]
    Cosine,

    /// Euclidean distance (L2), scored as `1 / (1 + distance)`.
    Euclidean,

    /// Inner product.
    DotProduct,
}

impl DistanceMetric {
    /// Score two vectors under this metric. Higher is more similar.
    pub fn similarity(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::Euclidean => 1.0 / (1.0 + euclidean_distance(a, b)),
            Self::DotProduct => dot_product(a, b),
        }
    }
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product = dot_product(a, b);
    let norm_a = (a.iter().map(|x| x * x).sum::<f32>()).sqrt();
    let norm_b = (b.iter().map(|x| x * x).sum::<f32>()).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Calculate dot product between two vectors.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Calculate Euclidean distance between two vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}
