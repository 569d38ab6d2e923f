//! Configuration for vector stores.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::traits::DistanceMetric;
use crate::{KilnError, Result};

/// Configuration for the vector store.
///
/// # Examples
///
/// ```rust
/// use kiln_core::config::VectorStoreConfig;
/// use kiln_core::traits::DistanceMetric;
///
/// let config = VectorStoreConfig::flat("data/vectorstore")
///     .with_metric(DistanceMetric::DotProduct);
/// assert_eq!(config.metric(), DistanceMetric::DotProduct);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VectorStoreConfig {
    /// Exact index persisted under a directory.
    Flat {
        /// Directory holding `index.bin` and `metadata.json`.
        path: PathBuf,

        /// Similarity metric.
        #[serde(default)]
        metric: DistanceMetric,

        /// Persist after every add.
        #[serde(default = "default_autosave")]
        autosave: bool,
    },

    /// Exact index kept in memory only.
    Memory {
        /// Similarity metric.
        #[serde(default)]
        metric: DistanceMetric,
    },
}

fn default_autosave() -> bool {
    true
}

impl VectorStoreConfig {
    /// Create a persistent flat store configuration.
    pub fn flat<P: Into<PathBuf>>(path: P) -> Self {
        Self::Flat {
            path: path.into(),
            metric: DistanceMetric::default(),
            autosave: true,
        }
    }

    /// Create an in-memory store configuration.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory {
            metric: DistanceMetric::default(),
        }
    }

    /// Set the similarity metric.
    #[must_use]
    pub fn with_metric(mut self, new_metric: DistanceMetric) -> Self {
        match &mut self {
            Self::Flat { metric, .. } | Self::Memory { metric } => *metric = new_metric,
        }
        self
    }

    /// Enable or disable saving after every add.
    #[must_use]
    pub fn with_autosave(mut self, enabled: bool) -> Self {
        if let Self::Flat { autosave, .. } = &mut self {
            *autosave = enabled;
        }
        self
    }

    /// Get the type tag used to select a factory.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Flat { .. } => "flat",
            Self::Memory { .. } => "memory",
        }
    }

    /// Get the similarity metric.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        match self {
            Self::Flat { metric, .. } | Self::Memory { metric } => *metric,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if let Self::Flat { path, .. } = self {
            if path.as_os_str().is_empty() {
                return Err(KilnError::configuration("Vector store path cannot be empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_flat() {
        let config: VectorStoreConfig = serde_json::from_value(serde_json::json!({
            "type": "flat",
            "path": "/tmp/vs",
            "metric": "euclidean"
        }))
        .unwrap();

        assert_eq!(
            config,
            VectorStoreConfig::flat("/tmp/vs").with_metric(DistanceMetric::Euclidean)
        );
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(VectorStoreConfig::flat("").validate().is_err());
        assert!(VectorStoreConfig::memory().validate().is_ok());
    }
}
