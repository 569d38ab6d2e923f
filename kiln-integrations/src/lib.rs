//! Concrete backends for Kiln.
//!
//! - [`providers`]: local GGUF models on Candle (`gguf` feature) and an
//!   Ollama HTTP client (`ollama` feature)
//! - [`embedders`]: FastEmbed ONNX models (`fastembed` feature) and a
//!   model-free hashing embedder
//! - [`vector_stores`]: an exact flat index persisted to a directory
//! - [`factory`]: builds all of the above from configuration

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod embedders;
pub mod factory;
pub mod providers;
pub mod vector_stores;

pub use embedders::HashingEmbedder;
pub use factory::{
    DefaultEmbedderFactory, DefaultProviderFactory, create_store, default_embedder_registry,
    default_provider_registry,
};
pub use vector_stores::FlatIndexStore;

#[cfg(feature = "fastembed")]
pub use embedders::FastEmbedder;

#[cfg(feature = "gguf")]
pub use providers::GgufProvider;

#[cfg(feature = "ollama")]
pub use providers::OllamaProvider;
