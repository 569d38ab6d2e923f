//! # Kiln
//!
//! Local language models, text embeddings and a persistent vector index
//! behind a small set of async traits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kiln::prelude::*;
//! use kiln::Pipeline;
//!
//! # async fn example() -> Result<()> {
//! kiln::init_tracing();
//!
//! let config = AppConfig::load().await?;
//! let pipeline = Pipeline::from_config(&config).await?;
//! let ids = pipeline.add_texts(["hello"]).await?;
//! assert_eq!(pipeline.get(ids[0]).await?.unwrap()["text"], "hello");
//!
//! let provider = kiln::integrations::default_provider_registry()
//!     .create_provider(&config.llm()?)
//!     .await?;
//! let answer = provider
//!     .generate("Q: What is a kiln?\nA:", &GenerationParams::new().with_stop(["\n"]))
//!     .await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **kiln-core**: traits, shared types, configuration and factories
//! - **kiln-integrations**: GGUF and Ollama providers, FastEmbed and
//!   hashing embedders, the flat vector index

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod pipeline;

// Re-export all public APIs from sub-crates
pub use kiln_core as core;
pub use kiln_integrations as integrations;

pub use pipeline::{Pipeline, Retrieved, TEXT_KEY};

use tracing_subscriber::EnvFilter;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use kiln_core::prelude::*;

    pub use crate::pipeline::{Pipeline, Retrieved};
    pub use kiln_integrations::{FlatIndexStore, HashingEmbedder};
}

/// Version information for Kiln.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a formatting subscriber filtered by `RUST_LOG`, defaulting to
/// `info` for the kiln crates. Does nothing if a subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("kiln=info,kiln_core=info,kiln_integrations=info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
