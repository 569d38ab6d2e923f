//! `FastEmbed` embedder implementation.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use kiln_core::{
    Result as CoreResult,
    traits::{Embedder, EmbeddingStats},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    config::FastEmbedConfig,
    error::{FastEmbedError, Result},
};
use crate::embedders::l2_normalize;

/// Embedder backed by a local FastEmbed ONNX model.
///
/// Inference is CPU bound and runs on the blocking thread pool.
pub struct FastEmbedder {
    config: FastEmbedConfig,
    model: Arc<TextEmbedding>,
    dimension: usize,
    stats: Mutex<EmbeddingStats>,
}

impl std::fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedder")
            .field("config", &self.config)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl FastEmbedder {
    /// Create an embedder for `sentence-transformers/all-MiniLM-L6-v2`.
    pub async fn new() -> Result<Self> {
        Self::from_config(FastEmbedConfig::default()).await
    }

    /// Create an embedder with a specific model name.
    pub async fn with_model<S: Into<String>>(model_name: S) -> Result<Self> {
        Self::from_config(FastEmbedConfig::new(model_name)).await
    }

    /// Create an embedder from a custom configuration.
    ///
    /// Downloads the model if it is not cached yet, then embeds a sample
    /// string to learn the output width.
    pub async fn from_config(config: FastEmbedConfig) -> Result<Self> {
        config.validate()?;

        info!("Initializing FastEmbed model: {}", config.model_name);

        let embedding_model = parse_model_name(&config.model_name)?;
        let mut init_options = InitOptions::new(embedding_model)
            .with_max_length(config.max_length)
            .with_show_download_progress(config.show_progress);

        if let Some(cache_dir) = &config.cache_dir {
            init_options = init_options.with_cache_dir(cache_dir.clone());
        }

        let model_name = config.model_name.clone();
        let (model, dimension) = tokio::task::spawn_blocking(move || {
            let model = TextEmbedding::try_new(init_options).map_err(|e| {
                FastEmbedError::ModelInit {
                    model: model_name.clone(),
                    reason: e.to_string(),
                }
            })?;

            let sample = model
                .embed(vec!["dimension check"], None)
                .map_err(|e| FastEmbedError::ModelInit {
                    model: model_name,
                    reason: e.to_string(),
                })?;
            let dimension = sample.first().map_or(0, Vec::len);
            Ok::<_, FastEmbedError>((model, dimension))
        })
        .await
        .map_err(|e| FastEmbedError::ModelInit {
            model: config.model_name.clone(),
            reason: e.to_string(),
        })??;

        info!(
            "FastEmbed model {} ready, dimension {}",
            config.model_name, dimension
        );

        Ok(Self {
            config,
            model: Arc::new(model),
            dimension,
            stats: Mutex::new(EmbeddingStats::new()),
        })
    }

    /// Get the configuration used by this embedder.
    pub fn config(&self) -> &FastEmbedConfig {
        &self.config
    }

    /// Get embedding statistics.
    pub async fn stats(&self) -> EmbeddingStats {
        self.stats.lock().await.clone()
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let batch_size = self.config.batch_size;
        let normalize = self.config.normalize;
        let count = texts.len();

        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || model.embed(texts, Some(batch_size)))
            .await
            .map_err(|e| FastEmbedError::Embedding {
                reason: e.to_string(),
            })
            .and_then(|inner| {
                inner.map_err(|e| FastEmbedError::Embedding {
                    reason: e.to_string(),
                })
            });
        self.record(count, start.elapsed(), result.is_ok()).await;

        let mut embeddings = result.inspect_err(|e| warn!("FastEmbed inference failed: {}", e))?;
        if normalize {
            embeddings.iter_mut().for_each(|v| l2_normalize(v));
        }

        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    async fn record(&self, texts: usize, duration: Duration, success: bool) {
        self.stats.lock().await.record(texts, duration, success);
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, text: &str) -> CoreResult<Vec<f32>> {
        let mut embeddings = self.run(vec![text.to_string()]).await?;
        embeddings.pop().ok_or_else(|| {
            FastEmbedError::Embedding {
                reason: "model returned no embedding".to_string(),
            }
            .into()
        })
    }

    async fn embed_batch(&self, texts: Vec<&str>) -> CoreResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let owned = texts.into_iter().map(str::to_string).collect();
        Ok(self.run(owned).await?)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }

    fn name(&self) -> &'static str {
        "FastEmbedder"
    }

    async fn health_check(&self) -> CoreResult<()> {
        self.embed("health check").await.map(|_| ())
    }
}

/// Map a model name to the FastEmbed model enum.
fn parse_model_name(model_name: &str) -> Result<EmbeddingModel> {
    match model_name {
        "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        "sentence-transformers/all-MiniLM-L12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "BAAI/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "BAAI/bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "BAAI/bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        "intfloat/multilingual-e5-base" => Ok(EmbeddingModel::MultilingualE5Base),
        "intfloat/multilingual-e5-large" => Ok(EmbeddingModel::MultilingualE5Large),
        "nomic-ai/nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        _ => Err(FastEmbedError::UnsupportedModel {
            model: model_name.to_string(),
        }),
    }
}
