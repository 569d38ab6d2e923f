//! Error types for the FastEmbed embedder.

use thiserror::Error;

/// Errors raised while loading or running a FastEmbed model.
#[derive(Error, Debug)]
pub enum FastEmbedError {
    /// Model name not known to FastEmbed
    #[error("Unsupported embedding model '{model}'")]
    UnsupportedModel {
        /// The requested model name
        model: String,
    },

    /// Model initialization failed
    #[error("Failed to initialize model '{model}': {reason}")]
    ModelInit {
        /// The model name that failed to initialize
        model: String,
        /// The reason for the failure
        reason: String,
    },

    /// Embedding generation failed
    #[error("Failed to generate embeddings: {reason}")]
    Embedding {
        /// The reason for the failure
        reason: String,
    },

    /// Configuration error
    #[error("Invalid configuration: {reason}")]
    Config {
        /// The reason for the configuration error
        reason: String,
    },
}

impl From<FastEmbedError> for kiln_core::KilnError {
    fn from(err: FastEmbedError) -> Self {
        match err {
            FastEmbedError::UnsupportedModel { .. } | FastEmbedError::Config { .. } => {
                kiln_core::KilnError::configuration(err.to_string())
            }
            _ => kiln_core::KilnError::embedding(err.to_string()),
        }
    }
}

/// Result type for FastEmbed operations.
pub type Result<T> = std::result::Result<T, FastEmbedError>;
