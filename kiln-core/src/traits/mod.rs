//! Core traits for the Kiln toolkit.
//!
//! Providers generate text, embedders turn text into vectors, and vector
//! indexes store and search those vectors. Every trait is object safe so
//! factories can hand out `Arc<dyn Trait>`.

pub mod embedder;
pub mod provider;
pub mod vector_index;

// Re-export all traits for convenience
pub use embedder::*;
pub use provider::*;
pub use vector_index::*;
