//! Error types for the Ollama provider.

use thiserror::Error;

/// Errors raised while talking to an Ollama server.
#[derive(Error, Debug)]
pub enum OllamaError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Ollama returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Server reported an error inside a response
    #[error("Ollama error: {message}")]
    Server {
        /// Message from the server
        message: String,
    },

    /// Response could not be decoded
    #[error("Invalid response from Ollama: {message}")]
    Decode {
        /// What went wrong
        message: String,
    },

    /// Invalid provider configuration
    #[error("Invalid configuration: {reason}")]
    Config {
        /// Why the configuration was rejected
        reason: String,
    },
}

impl OllamaError {
    pub(crate) fn decode(message: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: message.to_string(),
        }
    }
}

impl From<OllamaError> for kiln_core::KilnError {
    fn from(err: OllamaError) -> Self {
        match err {
            OllamaError::Config { .. } => kiln_core::KilnError::configuration(err.to_string()),
            _ => kiln_core::KilnError::llm(err.to_string()),
        }
    }
}

/// Result type for Ollama operations.
pub type Result<T> = std::result::Result<T, OllamaError>;
