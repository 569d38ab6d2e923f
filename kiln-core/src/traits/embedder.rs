//! Embedding generation traits.
//!
//! Embeddings are fixed-width vectors used for similarity search in the
//! vector index.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::Result;

/// Generates dense embeddings for text content.
///
/// # Examples
///
/// ```rust,no_run
/// use kiln_core::traits::Embedder;
/// use kiln_core::Result;
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct ConstantEmbedder {
///     dimension: usize,
/// }
///
/// #[async_trait]
/// impl Embedder for ConstantEmbedder {
///     async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
///         Ok(vec![0.1; self.dimension])
///     }
///
///     async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
///         Ok(texts.iter().map(|_| vec![0.1; self.dimension]).collect())
///     }
///
///     fn dimension(&self) -> usize {
///         self.dimension
///     }
///
///     fn model_name(&self) -> &str {
///         "constant"
///     }
/// }
/// ```
#[async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Generate embedding for a single text.
    ///
    /// The returned vector has exactly `dimension()` elements.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts in batch.
    ///
    /// Row `i` of the result is the embedding of `texts[i]`.
    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>>;

    /// Get the dimension of embeddings produced by this embedder.
    fn dimension(&self) -> usize;

    /// Get the name/identifier of the embedding model.
    fn model_name(&self) -> &str;

    /// Get a human-readable name for this embedder.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Check if the embedder is healthy and ready to generate embeddings.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    /// Get metadata about the embedding model.
    fn metadata(&self) -> HashMap<String, serde_json::Value> {
        let mut metadata = HashMap::new();
        metadata.insert("model_name".to_string(), self.model_name().into());
        metadata.insert("dimension".to_string(), self.dimension().into());
        metadata
    }
}

/// Statistics about embedding operations.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingStats {
    /// Number of texts embedded.
    pub texts_embedded: usize,

    /// Number of texts whose embedding failed.
    pub embeddings_failed: usize,

    /// Total time taken for embedding operations.
    pub duration: std::time::Duration,

    /// Average time per embedding.
    pub avg_time_per_embedding: std::time::Duration,
}

impl EmbeddingStats {
    /// Create new embedding statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate the success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        let total = self.texts_embedded + self.embeddings_failed;
        if total == 0 {
            0.0
        } else {
            (self.texts_embedded as f64 / total as f64) * 100.0
        }
    }

    /// Record one batch and refresh the running average.
    pub fn record(&mut self, texts: usize, duration: std::time::Duration, success: bool) {
        if success {
            self.texts_embedded += texts;
        } else {
            self.embeddings_failed += texts;
        }
        self.duration += duration;

        let total = self.texts_embedded + self.embeddings_failed;
        if total > 0 {
            self.avg_time_per_embedding = self.duration / u32::try_from(total).unwrap_or(u32::MAX);
        }
    }
}
