//! FastEmbed-based embedding implementation.
//!
//! Runs sentence-transformers style ONNX models locally. Model files are
//! downloaded into the cache directory on first use.
//!
//! ```rust,no_run
//! use kiln_integrations::embedders::fastembed::FastEmbedder;
//! use kiln_core::traits::Embedder;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let embedder = FastEmbedder::new().await?;
//! let embeddings = embedder.embed_batch(vec!["hello", "world"]).await?;
//! assert_eq!(embeddings[0].len(), embedder.dimension());
//! # Ok(())
//! # }
//! ```

mod config;
mod embedder;
mod error;

pub use config::{DEFAULT_MODEL, FastEmbedConfig};
pub use embedder::FastEmbedder;
pub use error::FastEmbedError;
