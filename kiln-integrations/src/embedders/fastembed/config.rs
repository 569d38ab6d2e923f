//! Configuration for the FastEmbed embedder.

use kiln_core::config::EmbedderConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::{FastEmbedError, Result};

/// Default model, matching the application defaults.
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Configuration for the FastEmbed embedder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FastEmbedConfig {
    /// Model name
    pub model_name: String,

    /// Maximum sequence length for tokenization
    pub max_length: usize,

    /// Batch size for processing
    pub batch_size: usize,

    /// Scale every embedding to unit length
    pub normalize: bool,

    /// Cache directory for models (None = FastEmbed default)
    pub cache_dir: Option<PathBuf>,

    /// Whether to show download progress
    pub show_progress: bool,
}

impl Default for FastEmbedConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL.to_string(),
            max_length: 512,
            batch_size: 32,
            normalize: true,
            cache_dir: None,
            show_progress: false,
        }
    }
}

impl FastEmbedConfig {
    /// Create a new configuration with the specified model.
    pub fn new<S: Into<String>>(model_name: S) -> Self {
        Self {
            model_name: model_name.into(),
            ..Default::default()
        }
    }

    /// Build from the `fast_embed` section of the application configuration.
    pub fn from_embedder_config(config: &EmbedderConfig) -> Result<Self> {
        match config {
            EmbedderConfig::FastEmbed {
                model_name,
                batch_size,
                normalize,
                cache_dir,
                show_download_progress,
            } => Ok(Self {
                model_name: model_name.clone(),
                batch_size: *batch_size,
                normalize: *normalize,
                cache_dir: cache_dir.clone(),
                show_progress: *show_download_progress,
                ..Default::default()
            }),
            other => Err(FastEmbedError::Config {
                reason: format!("expected a fast_embed section, got '{}'", other.kind()),
            }),
        }
    }

    /// Set the maximum sequence length.
    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Set the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the cache directory.
    pub fn with_cache_dir<P: Into<PathBuf>>(mut self, cache_dir: P) -> Self {
        self.cache_dir = Some(cache_dir.into());
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.model_name.is_empty() {
            return Err(FastEmbedError::Config {
                reason: "Model name cannot be empty".to_string(),
            });
        }

        if self.max_length == 0 {
            return Err(FastEmbedError::Config {
                reason: "Max length must be greater than 0".to_string(),
            });
        }

        if self.batch_size == 0 {
            return Err(FastEmbedError::Config {
                reason: "Batch size must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_embedder_config() {
        let section = EmbedderConfig::fast_embed("BAAI/bge-small-en-v1.5")
            .with_batch_size(8)
            .with_cache_dir("/tmp/models");

        let config = FastEmbedConfig::from_embedder_config(&section).unwrap();
        assert_eq!(config.model_name, "BAAI/bge-small-en-v1.5");
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/models")));
        assert!(config.normalize);

        assert!(FastEmbedConfig::from_embedder_config(&EmbedderConfig::hashing(8)).is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(FastEmbedConfig::default().validate().is_ok());
        assert!(FastEmbedConfig::new("").validate().is_err());
        assert!(FastEmbedConfig::default().with_max_length(0).validate().is_err());
    }
}
