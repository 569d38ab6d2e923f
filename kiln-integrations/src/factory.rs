//! Factories wiring configuration to the concrete backends in this crate.

use async_trait::async_trait;
use kiln_core::{
    KilnError, Result,
    config::{EmbedderConfig, ProviderConfig, VectorStoreConfig},
    factory::{EmbedderFactory, EmbedderFactoryRegistry, ProviderFactory, ProviderFactoryRegistry},
    traits::{Embedder, LlmProvider, VectorIndex},
};
use std::sync::Arc;
use tracing::info;

use crate::embedders::HashingEmbedder;
use crate::vector_stores::FlatIndexStore;

/// Builds the text generation backends compiled into this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultProviderFactory;

impl DefaultProviderFactory {
    /// Create a new factory.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProviderFactory for DefaultProviderFactory {
    async fn create_provider(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
        info!(
            "Creating {} provider for model {}",
            config.provider, config.model
        );

        match config.provider.as_str() {
            #[cfg(feature = "gguf")]
            "gguf" => {
                let provider = crate::providers::GgufProvider::from_config(config).await?;
                Ok(Arc::new(provider))
            }
            #[cfg(feature = "ollama")]
            "ollama" => {
                let provider = crate::providers::OllamaProvider::from_config(config)?;
                Ok(Arc::new(provider))
            }
            other => Err(KilnError::configuration(format!(
                "Unsupported provider: {other}"
            ))),
        }
    }

    fn can_create(&self, config: &ProviderConfig) -> bool {
        self.supported_providers().contains(&config.provider.as_str())
    }

    fn name(&self) -> &'static str {
        "DefaultProviderFactory"
    }

    fn supported_providers(&self) -> Vec<&'static str> {
        let mut providers = Vec::new();
        if cfg!(feature = "gguf") {
            providers.push("gguf");
        }
        if cfg!(feature = "ollama") {
            providers.push("ollama");
        }
        providers
    }

    async fn validate_config(&self, config: &ProviderConfig) -> Result<()> {
        config.validate()?;

        if config.provider == "gguf" && config.model_type.is_none() {
            return Err(KilnError::configuration(
                "model_type is required for provider: gguf",
            ));
        }

        Ok(())
    }
}

/// Builds the embedders compiled into this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEmbedderFactory;

impl DefaultEmbedderFactory {
    /// Create a new factory.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmbedderFactory for DefaultEmbedderFactory {
    async fn create_embedder(&self, config: &EmbedderConfig) -> Result<Arc<dyn Embedder>> {
        info!("Creating {} embedder", config.kind());

        match config {
            EmbedderConfig::Hashing { dimension } => Ok(Arc::new(HashingEmbedder::new(*dimension)?)),
            #[cfg(feature = "fastembed")]
            EmbedderConfig::FastEmbed { .. } => {
                let fastembed_config = crate::embedders::FastEmbedConfig::from_embedder_config(config)?;
                let embedder = crate::embedders::FastEmbedder::from_config(fastembed_config).await?;
                Ok(Arc::new(embedder))
            }
            #[cfg(not(feature = "fastembed"))]
            EmbedderConfig::FastEmbed { .. } => Err(KilnError::configuration(
                "fast_embed embeddings need the `fastembed` feature",
            )),
        }
    }

    fn can_create(&self, config: &EmbedderConfig) -> bool {
        self.supported_types().contains(&config.kind())
    }

    fn supported_types(&self) -> Vec<&'static str> {
        let mut types = vec!["hashing"];
        if cfg!(feature = "fastembed") {
            types.push("fast_embed");
        }
        types
    }
}

/// Registry with [`DefaultProviderFactory`] registered for every provider it
/// supports.
pub fn default_provider_registry() -> ProviderFactoryRegistry {
    let factory: Arc<dyn ProviderFactory> = Arc::new(DefaultProviderFactory);
    let mut registry = ProviderFactoryRegistry::new();
    for provider in factory.supported_providers() {
        registry.register(provider, Arc::clone(&factory));
    }
    registry
}

/// Registry with [`DefaultEmbedderFactory`] registered for every embedder
/// type it supports.
pub fn default_embedder_registry() -> EmbedderFactoryRegistry {
    let factory: Arc<dyn EmbedderFactory> = Arc::new(DefaultEmbedderFactory);
    let mut registry = EmbedderFactoryRegistry::new();
    for embedder_type in factory.supported_types() {
        registry.register(embedder_type, Arc::clone(&factory));
    }
    registry
}

/// Create a vector index from configuration.
///
/// The index still has to be loaded with the embedding dimension before use.
pub fn create_store(config: &VectorStoreConfig) -> Result<Arc<dyn VectorIndex>> {
    config.validate()?;
    info!("Creating {} vector store", config.kind());
    Ok(Arc::new(FlatIndexStore::from_config(config)))
}
