//! Text generation providers.
//!
//! A provider hides a language model backend behind two calls: `generate`
//! for a complete completion and `stream` for incremental fragments.

use async_trait::async_trait;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

use crate::{GenerationParams, Result};

/// A stream of generated text fragments.
///
/// The stream is finite and cannot be restarted; it ends when the backend
/// stops generating. Dropping it early stops generation.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Uniform interface for invoking a generative language model.
///
/// # Examples
///
/// ```rust,no_run
/// use kiln_core::traits::{LlmProvider, TokenStream};
/// use kiln_core::{GenerationParams, Result};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct EchoProvider;
///
/// #[async_trait]
/// impl LlmProvider for EchoProvider {
///     async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
///         Ok(prompt.to_string())
///     }
///
///     async fn stream(&self, prompt: &str, _params: &GenerationParams) -> Result<TokenStream> {
///         let fragments: Vec<Result<String>> =
///             prompt.split_inclusive(' ').map(|s| Ok(s.to_string())).collect();
///         Ok(Box::pin(futures::stream::iter(fragments)))
///     }
/// }
/// ```
#[async_trait]
pub trait LlmProvider: Send + Sync + std::fmt::Debug {
    /// Generate a complete completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged in meaning: bad parameters,
    /// decoding failures or transport errors.
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Generate a completion for `prompt` as a stream of fragments.
    ///
    /// Concatenating the fragments gives the same text `generate` returns
    /// for identical parameters and seed.
    async fn stream(&self, prompt: &str, params: &GenerationParams) -> Result<TokenStream>;

    /// Get a human-readable name for this provider.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Check if the provider is ready to generate.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    /// Get information about the underlying model.
    fn model_info(&self) -> ModelInfo {
        ModelInfo::default()
    }
}

/// Information about the underlying language model.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Name or identifier of the model.
    pub name: String,

    /// Provider of the model (e.g., "gguf", "ollama").
    pub provider: String,

    /// Architecture tag (e.g., "llama", "qwen2").
    pub model_type: Option<String>,

    /// Maximum context length in tokens.
    pub max_context_length: Option<usize>,

    /// Additional model metadata.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            provider: "unknown".to_string(),
            model_type: None,
            max_context_length: None,
            metadata: HashMap::new(),
        }
    }
}

/// Collect a token stream into a single string.
///
/// Fails on the first error the stream yields.
pub async fn collect_stream(mut stream: TokenStream) -> Result<String> {
    use futures::StreamExt;

    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_stream_concatenates() {
        let fragments: Vec<Result<String>> = vec![Ok("Hel".into()), Ok("lo".into())];
        let stream: TokenStream = Box::pin(futures::stream::iter(fragments));
        assert_eq!(collect_stream(stream).await.unwrap(), "Hello");
    }

    #[tokio::test]
    async fn test_collect_stream_stops_on_error() {
        let fragments: Vec<Result<String>> = vec![
            Ok("partial".into()),
            Err(crate::KilnError::llm("decode failed")),
            Ok("never".into()),
        ];
        let stream: TokenStream = Box::pin(futures::stream::iter(fragments));
        assert!(collect_stream(stream).await.is_err());
    }

    #[test]
    fn test_model_info_default() {
        let info = ModelInfo::default();
        assert_eq!(info.name, "unknown");
        assert!(info.model_type.is_none());
    }
}
