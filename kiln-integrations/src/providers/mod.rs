//! Text generation backends.

#[cfg(feature = "gguf")]
pub mod gguf;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "gguf")]
pub use gguf::{GgufConfig, GgufError, GgufProvider};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaError, OllamaProvider};
