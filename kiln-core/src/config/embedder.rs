//! Configuration for embedding models.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{KilnError, Result};

/// Configuration for embedding models.
///
/// The `type` tag selects the implementation.
///
/// # Examples
///
/// ```rust
/// use kiln_core::config::EmbedderConfig;
///
/// let config: EmbedderConfig = serde_json::from_value(serde_json::json!({
///     "type": "fast_embed",
///     "model_name": "sentence-transformers/all-MiniLM-L6-v2"
/// }))
/// .unwrap();
///
/// assert_eq!(config.model_name(), "sentence-transformers/all-MiniLM-L6-v2");
/// assert_eq!(config.batch_size(), 32);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmbedderConfig {
    /// Local ONNX sentence-transformers model.
    FastEmbed {
        /// Name of the model.
        model_name: String,

        /// Batch size for processing.
        #[serde(default = "default_batch_size")]
        batch_size: usize,

        /// Whether to normalize embeddings to unit length.
        #[serde(default = "default_true")]
        normalize: bool,

        /// Directory for downloaded model files.
        #[serde(default)]
        cache_dir: Option<PathBuf>,

        /// Whether to show download progress.
        #[serde(default)]
        show_download_progress: bool,
    },

    /// Feature hashing of word unigrams. Needs no model files.
    Hashing {
        /// Width of the produced vectors.
        #[serde(default = "default_hashing_dimension")]
        dimension: usize,
    },
}

fn default_batch_size() -> usize {
    32
}

fn default_true() -> bool {
    true
}

fn default_hashing_dimension() -> usize {
    384
}

impl EmbedderConfig {
    /// Create a new FastEmbed configuration.
    pub fn fast_embed<S: Into<String>>(model_name: S) -> Self {
        Self::FastEmbed {
            model_name: model_name.into(),
            batch_size: default_batch_size(),
            normalize: true,
            cache_dir: None,
            show_download_progress: false,
        }
    }

    /// Create a new hashing configuration.
    #[must_use]
    pub fn hashing(dimension: usize) -> Self {
        Self::Hashing { dimension }
    }

    /// Set batch size for the embedder.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        if let Self::FastEmbed { batch_size: bs, .. } = &mut self {
            *bs = batch_size;
        }
        self
    }

    /// Set the model cache directory.
    pub fn with_cache_dir<P: Into<PathBuf>>(mut self, cache_dir: P) -> Self {
        if let Self::FastEmbed { cache_dir: dir, .. } = &mut self {
            *dir = Some(cache_dir.into());
        }
        self
    }

    /// Get the type tag used to select a factory.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FastEmbed { .. } => "fast_embed",
            Self::Hashing { .. } => "hashing",
        }
    }

    /// Get the model name.
    #[must_use]
    pub fn model_name(&self) -> &str {
        match self {
            Self::FastEmbed { model_name, .. } => model_name,
            Self::Hashing { .. } => "hashing",
        }
    }

    /// Get the batch size.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        match self {
            Self::FastEmbed { batch_size, .. } => *batch_size,
            Self::Hashing { .. } => usize::MAX,
        }
    }

    /// Check if this is a local model that may need a download.
    #[must_use]
    pub fn requires_download(&self) -> bool {
        matches!(self, Self::FastEmbed { .. })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::FastEmbed {
                model_name,
                batch_size,
                ..
            } => {
                if model_name.is_empty() {
                    return Err(KilnError::configuration("Model name cannot be empty"));
                }
                if *batch_size == 0 {
                    return Err(KilnError::configuration(
                        "Batch size must be greater than 0",
                    ));
                }
            }
            Self::Hashing { dimension } => {
                if *dimension == 0 {
                    return Err(KilnError::configuration(
                        "Hashing dimension must be greater than 0",
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_filled_in() {
        let config: EmbedderConfig =
            serde_json::from_value(serde_json::json!({"type": "hashing"})).unwrap();
        assert_eq!(config, EmbedderConfig::hashing(384));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: std::result::Result<EmbedderConfig, _> =
            serde_json::from_value(serde_json::json!({"type": "word2vec", "model_name": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        assert!(EmbedderConfig::fast_embed("m").validate().is_ok());
        assert!(
            EmbedderConfig::fast_embed("m")
                .with_batch_size(0)
                .validate()
                .is_err()
        );
        assert!(EmbedderConfig::hashing(0).validate().is_err());
    }
}
