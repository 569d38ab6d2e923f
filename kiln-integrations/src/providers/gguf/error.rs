//! Error types for the GGUF provider.

use thiserror::Error;

/// Errors raised while loading or running a GGUF model.
#[derive(Error, Debug)]
pub enum GgufError {
    /// Model path or file could not be found
    #[error("Model not found: {path}")]
    ModelNotFound {
        /// The path or repository that was looked up
        path: String,
    },

    /// Architecture tag not supported
    #[error("Unsupported model type '{model_type}', expected one of: llama, mistral, qwen2, phi3")]
    UnsupportedModelType {
        /// The requested architecture tag
        model_type: String,
    },

    /// Invalid construction or generation option
    #[error("Invalid configuration: {reason}")]
    Config {
        /// Why the configuration was rejected
        reason: String,
    },

    /// Hugging Face Hub download failed
    #[error("Download failed for {repo}: {message}")]
    Download {
        /// Repository id
        repo: String,
        /// Error message from the hub client
        message: String,
    },

    /// Tokenizer loading or decoding failed
    #[error("Tokenizer error: {message}")]
    Tokenizer {
        /// Error message
        message: String,
    },

    /// Tensor or model error from Candle
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    /// I/O error while reading model files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generation could not run
    #[error("Generation failed: {message}")]
    Generation {
        /// Error message
        message: String,
    },
}

impl GgufError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub(crate) fn tokenizer(message: impl std::fmt::Display) -> Self {
        Self::Tokenizer {
            message: message.to_string(),
        }
    }

    pub(crate) fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }
}

impl From<GgufError> for kiln_core::KilnError {
    fn from(err: GgufError) -> Self {
        match err {
            GgufError::ModelNotFound { path } => kiln_core::KilnError::not_found(path),
            GgufError::UnsupportedModelType { .. } | GgufError::Config { .. } => {
                kiln_core::KilnError::configuration(err.to_string())
            }
            GgufError::Io(e) => kiln_core::KilnError::Io(e),
            _ => kiln_core::KilnError::llm(err.to_string()),
        }
    }
}

/// Result type for GGUF operations.
pub type Result<T> = std::result::Result<T, GgufError>;
