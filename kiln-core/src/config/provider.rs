//! Configuration for text generation providers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{KilnError, Result};

/// Configuration for a text generation provider.
///
/// `provider` selects the backend; the remaining fields follow the
/// construction convention shared by every backend: a model identifier,
/// an optional model file inside it, an architecture tag, and a free-form
/// map of backend options.
///
/// # Examples
///
/// ```rust
/// use kiln_core::config::ProviderConfig;
///
/// let local = ProviderConfig::new("gguf", "TheBloke/Llama-2-7B-Chat-GGUF")
///     .with_model_file("llama-2-7b-chat.Q4_K_M.gguf")
///     .with_model_type("llama")
///     .with_config("max_new_tokens", 128)
///     .with_config("temperature", 0.2);
///
/// let remote = ProviderConfig::new("ollama", "llama3")
///     .with_base_url("http://localhost:11434");
///
/// assert!(local.validate().is_ok());
/// assert!(remote.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Backend name ("gguf", "ollama").
    pub provider: String,

    /// Model path, directory or repository id.
    pub model: String,

    /// Specific model file inside `model`.
    #[serde(default)]
    pub model_file: Option<String>,

    /// Architecture tag (e.g., "llama", "qwen2").
    #[serde(default)]
    pub model_type: Option<String>,

    /// Server URL for HTTP backends.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Backend options applied at construction.
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

impl ProviderConfig {
    /// Create a new provider configuration.
    pub fn new<S1: Into<String>, S2: Into<String>>(provider: S1, model: S2) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            model_file: None,
            model_type: None,
            base_url: None,
            config: HashMap::new(),
        }
    }

    /// Set the model file.
    pub fn with_model_file<S: Into<String>>(mut self, model_file: S) -> Self {
        self.model_file = Some(model_file.into());
        self
    }

    /// Set the model type.
    pub fn with_model_type<S: Into<String>>(mut self, model_type: S) -> Self {
        self.model_type = Some(model_type.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Add a backend option.
    pub fn with_config<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Whether the backend runs in-process.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.provider == "gguf"
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.provider.is_empty() {
            return Err(KilnError::configuration("Provider cannot be empty"));
        }

        if self.model.is_empty() {
            return Err(KilnError::configuration("Model cannot be empty"));
        }

        // In-process backends never dial out, so their base URL is ignored.
        if let (false, Some(base_url)) = (self.is_local(), &self.base_url) {
            normalize_base_url(base_url)?;
        }

        Ok(())
    }
}

/// Normalize a server address the way Ollama clients read `OLLAMA_HOST`.
///
/// A bare `host:port` gets an `http://` scheme and trailing slashes are
/// dropped. Any scheme other than `http` or `https` is rejected.
///
/// ```rust
/// use kiln_core::config::normalize_base_url;
///
/// assert_eq!(normalize_base_url("0.0.0.0:11434").unwrap(), "http://0.0.0.0:11434");
/// assert_eq!(normalize_base_url("https://gpu-box/").unwrap(), "https://gpu-box");
/// assert!(normalize_base_url("ftp://gpu-box").is_err());
/// ```
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(KilnError::configuration("Base URL cannot be empty"));
    }

    match trimmed.split_once("://") {
        None => Ok(format!("http://{trimmed}")),
        Some(("http" | "https", rest)) if !rest.is_empty() => Ok(trimmed.to_string()),
        Some(_) => Err(KilnError::configuration(format!(
            "Base URL must be an http:// or https:// address, got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder() {
        let config = ProviderConfig::new("gguf", "models/llama")
            .with_model_file("q4.gguf")
            .with_model_type("llama")
            .with_config("top_k", 20);

        assert_eq!(config.model_file.as_deref(), Some("q4.gguf"));
        assert_eq!(config.model_type.as_deref(), Some("llama"));
        assert_eq!(config.config["top_k"], serde_json::json!(20));
        assert!(config.is_local());
    }

    #[test]
    fn test_validation() {
        assert!(ProviderConfig::new("", "m").validate().is_err());
        assert!(ProviderConfig::new("gguf", "").validate().is_err());
        assert!(
            ProviderConfig::new("ollama", "llama3")
                .with_base_url("ftp://localhost:11434")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_scheme_less_base_url() {
        assert!(
            ProviderConfig::new("ollama", "llama3")
                .with_base_url("0.0.0.0:11434")
                .validate()
                .is_ok()
        );
        assert_eq!(normalize_base_url("0.0.0.0:11434").unwrap(), "http://0.0.0.0:11434");
        assert_eq!(normalize_base_url(" http://gpu-box:11434/ ").unwrap(), "http://gpu-box:11434");
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("http://").is_err());
    }

    #[test]
    fn test_local_provider_ignores_base_url() {
        let config = ProviderConfig::new("gguf", "models/llama").with_base_url("unix:///run/ollama");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: ProviderConfig =
            serde_json::from_value(serde_json::json!({"provider": "ollama", "model": "llama3"}))
                .unwrap();
        assert_eq!(config, ProviderConfig::new("ollama", "llama3"));
    }
}
