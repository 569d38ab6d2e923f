//! Ollama HTTP provider.

use async_trait::async_trait;
use futures::{StreamExt, stream};
use kiln_core::{
    GenerationParams, Result as CoreResult,
    config::{ProviderConfig, normalize_base_url},
    traits::{LlmProvider, ModelInfo, TokenStream},
};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    error::{OllamaError, Result},
    wire::{self, GenerateChunk, GenerateRequest},
};

/// Address of a local Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Text generation through an Ollama server's `/api/generate` endpoint.
///
/// Parameters given at construction act as defaults; per-call parameters
/// override them key by key.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    model: String,
    base_url: String,
    defaults: GenerationParams,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for `model` on the server at `base_url`
    /// (`http://localhost:11434` when `None`). A bare `host:port`, as
    /// `OLLAMA_HOST` is usually set, is read as `http://host:port`.
    pub fn new(model: impl Into<String>, base_url: Option<&str>) -> Result<Self> {
        let base_url = normalize_base_url(base_url.unwrap_or(DEFAULT_BASE_URL)).map_err(|e| {
            OllamaError::Config {
                reason: e.to_string(),
            }
        })?;

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            model: model.into(),
            base_url,
            defaults: GenerationParams::default(),
            client,
        })
    }

    /// Create a provider from configuration; the `config` map becomes the
    /// default generation parameters.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let defaults = GenerationParams::from_value(Value::Object(
            config
                .config
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ))
        .map_err(|e| OllamaError::Config {
            reason: e.to_string(),
        })?;

        Ok(Self::new(config.model.clone(), config.base_url.as_deref())?.with_defaults(defaults))
    }

    /// Set the default generation parameters.
    #[must_use]
    pub fn with_defaults(mut self, defaults: GenerationParams) -> Self {
        self.defaults = defaults;
        self
    }

    /// Server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        prompt: &str,
        params: &GenerationParams,
        stream: bool,
    ) -> Result<reqwest::Response> {
        send(
            &self.client,
            &self.endpoint("/api/generate"),
            &self.model,
            prompt,
            &self.defaults.merged_with(params),
            stream,
        )
        .await
    }
}

async fn send(
    client: &reqwest::Client,
    url: &str,
    model: &str,
    prompt: &str,
    params: &GenerationParams,
    stream: bool,
) -> Result<reqwest::Response> {
    let request = GenerateRequest {
        model,
        prompt,
        stream,
        options: wire::options(params),
    };
    debug!("POST {} (stream: {}, options: {:?})", url, stream, request.options);

    let response = client.post(url).json(&request).send().await?;
    check_status(response).await
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(OllamaError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> CoreResult<String> {
        let response = self.send(prompt, params, false).await?;
        let chunk: GenerateChunk = response
            .json()
            .await
            .map_err(|e| OllamaError::decode(e.to_string()))?;

        if let Some(message) = chunk.error {
            return Err(OllamaError::Server { message }.into());
        }

        info!(
            "Ollama generated {:?} tokens with {}",
            chunk.eval_count, self.model
        );
        Ok(chunk.response)
    }

    async fn stream(&self, prompt: &str, params: &GenerationParams) -> CoreResult<TokenStream> {
        let client = self.client.clone();
        let url = self.endpoint("/api/generate");
        let model = self.model.clone();
        let prompt = prompt.to_string();
        let params = self.defaults.merged_with(params);

        // The request goes out on the first poll.
        let stream = stream::once(async move {
            match send(&client, &url, &model, &prompt, &params, true).await {
                Ok(response) => wire::fragments(response.bytes_stream().boxed()).boxed(),
                Err(e) => stream::iter([Err(e)]).boxed(),
            }
        })
        .flatten()
        .map(|item| item.map_err(kiln_core::KilnError::from));

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &'static str {
        "OllamaProvider"
    }

    async fn health_check(&self) -> CoreResult<()> {
        let response = self
            .client
            .get(self.endpoint("/api/tags"))
            .send()
            .await
            .map_err(OllamaError::from)?;
        check_status(response).await?;
        Ok(())
    }

    fn model_info(&self) -> ModelInfo {
        let mut metadata = HashMap::new();
        metadata.insert("base_url".to_string(), Value::String(self.base_url.clone()));

        ModelInfo {
            name: self.model.clone(),
            provider: "ollama".to_string(),
            model_type: None,
            max_context_length: None,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::KilnError;

    #[test]
    fn test_default_base_url() {
        let provider = OllamaProvider::new("llama3", None).unwrap();
        assert_eq!(provider.base_url(), DEFAULT_BASE_URL);
        assert_eq!(
            provider.endpoint("/api/generate"),
            "http://localhost:11434/api/generate"
        );
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let provider = OllamaProvider::new("llama3", Some("http://gpu-box:11434/")).unwrap();
        assert_eq!(provider.base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = OllamaProvider::new("llama3", Some("ftp://gpu-box:11434")).unwrap_err();
        assert!(matches!(KilnError::from(err), KilnError::Configuration { .. }));
    }

    #[test]
    fn test_bare_host_gets_http_scheme() {
        let provider = OllamaProvider::new("llama3", Some("0.0.0.0:11434")).unwrap();
        assert_eq!(provider.base_url(), "http://0.0.0.0:11434");
    }

    #[test]
    fn test_from_config_takes_defaults() {
        let config = ProviderConfig::new("ollama", "llama3")
            .with_config("temperature", 0.2)
            .with_config("num_ctx", 4096);

        let provider = OllamaProvider::from_config(&config).unwrap();
        assert_eq!(provider.defaults.temperature, Some(0.2));
        assert_eq!(provider.defaults.extra.get("num_ctx"), Some(&serde_json::json!(4096)));
    }

    #[test]
    fn test_model_info() {
        let info = OllamaProvider::new("llama3", None).unwrap().model_info();
        assert_eq!(info.name, "llama3");
        assert_eq!(info.provider, "ollama");
    }
}
