//! Prelude module for convenient imports.
//!
//! ```rust
//! use kiln_core::prelude::*;
//!
//! let hit = SearchHit::new(0, 0.5);
//! assert_eq!(hit.id, 0);
//! ```

pub use crate::error::{KilnError, Result};

pub use crate::types::{GenerationParams, Metadata, SearchHit};

pub use crate::traits::{
    DistanceMetric, Embedder, EmbeddingStats, LlmProvider, ModelInfo, TokenStream, VectorIndex,
    collect_stream,
};

pub use crate::config::{AppConfig, EmbedderConfig, ProviderConfig, VectorStoreConfig};

pub use crate::factory::{
    EmbedderFactory, EmbedderFactoryRegistry, ProviderFactory, ProviderFactoryRegistry,
};
