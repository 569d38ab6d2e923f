//! # Kiln Core
//!
//! Core traits, types, and configuration for Kiln, a toolkit for running
//! local language models next to an embedding and vector search pipeline.
//!
//! This crate provides:
//!
//! - **Traits**: [`LlmProvider`], [`Embedder`] and [`VectorIndex`]
//! - **Generation parameters**: [`GenerationParams`], merged from backend
//!   defaults, construction options and per-call values
//! - **Configuration**: typed sections and the layered [`config::AppConfig`] loader
//! - **Factories**: registries that build components from configuration
//! - **Error handling**: [`KilnError`] and the crate-wide [`Result`] alias
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kiln_core::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let config = AppConfig::load().await?;
//! let embeddings = config.embeddings()?;
//! println!("embedding model: {}", embeddings.model_name());
//!
//! let params = GenerationParams::new().with_max_new_tokens(64).with_temperature(0.2);
//! assert_eq!(params.max_new_tokens, Some(64));
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude;

pub mod config;
pub mod error;
pub mod factory;
pub mod traits;
pub mod types;

pub use error::{KilnError, Result};
pub use types::{GenerationParams, Metadata, SearchHit};

pub use traits::*;

/// Version information for the Kiln core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the Kiln core library.
pub const NAME: &str = env!("CARGO_PKG_NAME");
