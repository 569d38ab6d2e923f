//! Factory for creating text generation providers from configuration.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{KilnError, Result, config::ProviderConfig, traits::LlmProvider};

/// Factory for creating providers from configuration.
///
/// # Examples
///
/// ```rust,no_run
/// use kiln_core::factory::ProviderFactory;
/// use kiln_core::config::ProviderConfig;
/// use kiln_core::traits::LlmProvider;
/// use kiln_core::Result;
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// #[derive(Debug)]
/// struct MyProviderFactory;
///
/// #[async_trait]
/// impl ProviderFactory for MyProviderFactory {
///     async fn create_provider(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
///         todo!("construct the backend for {}", config.model)
///     }
///
///     fn can_create(&self, config: &ProviderConfig) -> bool {
///         config.provider == "mine"
///     }
///
///     fn supported_providers(&self) -> Vec<&'static str> {
///         vec!["mine"]
///     }
/// }
/// ```
#[async_trait]
pub trait ProviderFactory: Send + Sync + std::fmt::Debug {
    /// Create a provider from configuration.
    ///
    /// Loading the model happens here; a model that cannot be loaded is
    /// reported as an error.
    async fn create_provider(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>>;

    /// Check if this factory can create a provider for the given configuration.
    fn can_create(&self, config: &ProviderConfig) -> bool;

    /// Get a human-readable name for this factory.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Get the supported provider names.
    fn supported_providers(&self) -> Vec<&'static str>;

    /// Validate the configuration without creating the provider.
    async fn validate_config(&self, config: &ProviderConfig) -> Result<()> {
        config.validate()
    }
}

/// Registry for provider factories, keyed by provider name.
#[derive(Debug, Default)]
pub struct ProviderFactoryRegistry {
    factories: HashMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderFactoryRegistry {
    /// Create a new provider factory registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory for a provider name.
    pub fn register<S: Into<String>>(&mut self, provider: S, factory: Arc<dyn ProviderFactory>) {
        self.factories.insert(provider.into(), factory);
    }

    /// Create a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no factory is registered for `config.provider`,
    /// if the configuration is invalid, or if the factory fails.
    pub async fn create_provider(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
        let factory = self.factory_for(config)?;

        if !factory.can_create(config) {
            return Err(KilnError::configuration(format!(
                "Factory {} cannot create provider for the given configuration",
                factory.name()
            )));
        }

        factory.validate_config(config).await?;
        factory.create_provider(config).await
    }

    /// Check if a provider can be created for the given configuration.
    #[must_use]
    pub fn can_create(&self, config: &ProviderConfig) -> bool {
        self.factories
            .get(&config.provider)
            .is_some_and(|factory| factory.can_create(config))
    }

    /// Get all registered provider names.
    #[must_use]
    pub fn registered_providers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Remove a factory from the registry.
    pub fn unregister(&mut self, provider: &str) -> Option<Arc<dyn ProviderFactory>> {
        self.factories.remove(provider)
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

    fn factory_for(&self, config: &ProviderConfig) -> Result<&Arc<dyn ProviderFactory>> {
        self.factories.get(&config.provider).ok_or_else(|| {
            KilnError::configuration(format!(
                "No factory registered for provider: {}",
                config.provider
            ))
        })
    }
}
