//! Feature hashing embedder.
//!
//! Each lower-cased word is hashed into one of `dimension` buckets with a
//! sign taken from another bit of the same hash; the bucket counts are then
//! scaled to unit length. The result depends only on the text, so it needs
//! no model files and is identical across runs and machines.

use async_trait::async_trait;
use kiln_core::{KilnError, Result, traits::Embedder};
use std::collections::HashMap;
use tracing::debug;

use super::l2_normalize;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic bag-of-words embedder.
///
/// Texts sharing no words are orthogonal; identical texts have cosine
/// similarity 1.
///
/// ```rust
/// use kiln_integrations::HashingEmbedder;
/// use kiln_core::traits::Embedder;
///
/// let embedder = HashingEmbedder::new(64).unwrap();
/// assert_eq!(embedder.dimension(), 64);
/// ```
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of `dimension` elements.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(KilnError::configuration(
                "Hashing dimension must be greater than 0",
            ));
        }
        Ok(Self { dimension })
    }

    /// Embed synchronously.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        l2_normalize(&mut vector);
        vector
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        debug!("Hashing {} texts into {} buckets", texts.len(), self.dimension);
        Ok(texts.into_iter().map(|t| self.embed_sync(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hashing"
    }

    fn name(&self) -> &'static str {
        "HashingEmbedder"
    }

    fn metadata(&self) -> HashMap<String, serde_json::Value> {
        let mut metadata = HashMap::new();
        metadata.insert("model_name".to_string(), "hashing".into());
        metadata.insert("dimension".to_string(), self.dimension.into());
        metadata.insert("tokenizer".to_string(), "lowercase_words".into());
        metadata
    }
}
