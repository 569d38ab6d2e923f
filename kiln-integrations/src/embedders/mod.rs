//! Embedding model implementations.

pub mod hashing;

#[cfg(feature = "fastembed")]
pub mod fastembed;

pub use hashing::HashingEmbedder;

#[cfg(feature = "fastembed")]
pub use fastembed::{FastEmbedConfig, FastEmbedder};

/// Scale `vector` to unit length. Zero vectors are left unchanged.
pub(crate) fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}
