//! Search result types shared by vector indexes.

use serde::{Deserialize, Serialize};

/// Metadata stored alongside each vector.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A single ranked search result.
///
/// Scores are similarities: a higher score is always a better match,
/// whatever distance metric the index uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Integer handle assigned by the index when the vector was added.
    pub id: u64,

    /// Similarity score.
    pub score: f32,
}

impl SearchHit {
    /// Create a new hit.
    #[must_use]
    pub fn new(id: u64, score: f32) -> Self {
        Self { id, score }
    }

    /// The hit as an `(id, score)` pair.
    #[must_use]
    pub fn as_pair(&self) -> (u64, f32) {
        (self.id, self.score)
    }
}

/// Build a metadata map from `(key, value)` pairs.
///
/// ```rust
/// use kiln_core::types::metadata;
///
/// let meta = metadata([("text", "hello")]);
/// assert_eq!(meta["text"], "hello");
/// ```
pub fn metadata<I, K, V>(pairs: I) -> Metadata
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
