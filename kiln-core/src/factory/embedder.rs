//! Factory for creating embedders from configuration.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{KilnError, Result, config::EmbedderConfig, traits::Embedder};

/// Factory for creating embedders from configuration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbedderFactory: Send + Sync + std::fmt::Debug {
    /// Create an embedder from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedder cannot be created due to invalid
    /// configuration, a failed model download, or initialization failures.
    async fn create_embedder(&self, config: &EmbedderConfig) -> Result<Arc<dyn Embedder>>;

    /// Check if this factory can create an embedder for the given configuration.
    fn can_create(&self, config: &EmbedderConfig) -> bool;

    /// Get the supported embedder types.
    fn supported_types(&self) -> Vec<&'static str>;
}

/// Registry for embedder factories, keyed by the config `type` tag.
///
/// # Examples
///
/// ```rust,no_run
/// use kiln_core::factory::EmbedderFactoryRegistry;
/// use kiln_core::config::EmbedderConfig;
///
/// # async fn example(registry: EmbedderFactoryRegistry) -> kiln_core::Result<()> {
/// let embedder = registry.create_embedder(&EmbedderConfig::hashing(64)).await?;
/// assert_eq!(embedder.dimension(), 64);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct EmbedderFactoryRegistry {
    factories: HashMap<String, Arc<dyn EmbedderFactory>>,
}

impl EmbedderFactoryRegistry {
    /// Create a new embedder factory registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory for a specific embedder type.
    pub fn register<S: Into<String>>(
        &mut self,
        embedder_type: S,
        factory: Arc<dyn EmbedderFactory>,
    ) {
        self.factories.insert(embedder_type.into(), factory);
    }

    /// Create an embedder from configuration.
    pub async fn create_embedder(&self, config: &EmbedderConfig) -> Result<Arc<dyn Embedder>> {
        let embedder_type = config.kind();

        let factory = self.factories.get(embedder_type).ok_or_else(|| {
            KilnError::configuration(format!(
                "No factory registered for embedder type: {embedder_type}"
            ))
        })?;

        if !factory.can_create(config) {
            return Err(KilnError::configuration(format!(
                "Factory for '{embedder_type}' cannot create embedder for the given configuration"
            )));
        }

        config.validate()?;
        factory.create_embedder(config).await
    }

    /// Check if an embedder can be created for the given configuration.
    #[must_use]
    pub fn can_create(&self, config: &EmbedderConfig) -> bool {
        self.factories
            .get(config.kind())
            .is_some_and(|factory| factory.can_create(config))
    }

    /// Get all registered embedder types.
    #[must_use]
    pub fn registered_types(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Remove a factory from the registry.
    pub fn unregister(&mut self, embedder_type: &str) -> Option<Arc<dyn EmbedderFactory>> {
        self.factories.remove(embedder_type)
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Get the number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashing_only_factory() -> MockEmbedderFactory {
        let mut factory = MockEmbedderFactory::new();
        factory
            .expect_can_create()
            .returning(|config| matches!(config, EmbedderConfig::Hashing { .. }));
        factory
    }

    #[test]
    fn test_can_create() {
        let mut registry = EmbedderFactoryRegistry::new();
        registry.register("hashing", Arc::new(hashing_only_factory()));

        assert!(registry.can_create(&EmbedderConfig::hashing(16)));
        assert!(!registry.can_create(&EmbedderConfig::fast_embed("m")));
    }

    #[tokio::test]
    async fn test_factory_error_propagates() {
        let mut factory = hashing_only_factory();
        factory
            .expect_create_embedder()
            .times(1)
            .returning(|_| Err(KilnError::embedding("model unavailable")));

        let mut registry = EmbedderFactoryRegistry::new();
        registry.register("hashing", Arc::new(factory));

        let err = registry
            .create_embedder(&EmbedderConfig::hashing(16))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model unavailable"));
    }

    #[tokio::test]
    async fn test_invalid_config_never_reaches_factory() {
        let mut factory = hashing_only_factory();
        factory.expect_create_embedder().never();

        let mut registry = EmbedderFactoryRegistry::new();
        registry.register("hashing", Arc::new(factory));

        assert!(
            registry
                .create_embedder(&EmbedderConfig::hashing(0))
                .await
                .is_err()
        );
    }

    #[test]
    fn test_unregister() {
        let mut registry = EmbedderFactoryRegistry::new();
        registry.register("hashing", Arc::new(MockEmbedderFactory::new()));
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister("hashing").is_some());
        assert!(registry.unregister("nonexistent").is_none());
        assert!(registry.is_empty());
    }
}
