//! Embedding plus vector index, wired from configuration.

use kiln_core::{
    KilnError, Metadata, Result, SearchHit,
    config::AppConfig,
    traits::{Embedder, VectorIndex},
};
use kiln_integrations::{create_store, default_embedder_registry};
use std::sync::Arc;
use tracing::{debug, info};

/// Metadata key holding the original text of a record.
pub const TEXT_KEY: &str = "text";

/// A search hit together with the stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    /// Record id.
    pub id: u64,
    /// Similarity score; higher is better.
    pub score: f32,
    /// Stored metadata.
    pub metadata: Metadata,
}

/// Text in, nearest records out.
///
/// ```rust,no_run
/// use kiln::Pipeline;
/// use kiln::core::config::AppConfig;
///
/// # async fn example() -> kiln::core::Result<()> {
/// let config = AppConfig::load().await?;
/// let pipeline = Pipeline::from_config(&config).await?;
///
/// pipeline.add_texts(["Paris is the capital of France"]).await?;
/// let results = pipeline.search("capital of France", 1).await?;
/// println!("{:?}", results[0].metadata);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorIndex>,
}

impl Pipeline {
    /// Build the embedder and vector index from the `embeddings` and
    /// `vectorstore` sections, then load the index.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let embedder = default_embedder_registry()
            .create_embedder(&config.embeddings()?)
            .await?;
        let store = create_store(&config.vectorstore()?)?;
        Self::open(embedder, store).await
    }

    /// Load `store` with the embedder's dimension.
    pub async fn open(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorIndex>) -> Result<Self> {
        store.load(embedder.dimension()).await?;
        info!(
            "Pipeline ready: {} ({} dims) over {} with {} records",
            embedder.model_name(),
            embedder.dimension(),
            store.name(),
            store.count().await?
        );
        Ok(Self { embedder, store })
    }

    /// The embedder.
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// The vector index.
    pub fn store(&self) -> &Arc<dyn VectorIndex> {
        &self.store
    }

    /// Embed and store texts, keeping each under [`TEXT_KEY`].
    pub async fn add_texts<I, S>(&self, texts: I) -> Result<Vec<u64>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let records = texts
            .into_iter()
            .map(|text| (text.into(), Metadata::new()))
            .collect();
        self.add_documents(records).await
    }

    /// Embed and store texts with their own metadata.
    ///
    /// The embedded text is stored under [`TEXT_KEY`], replacing any value
    /// the caller put there, so a record always describes its own vector.
    pub async fn add_documents(&self, documents: Vec<(String, Metadata)>) -> Result<Vec<u64>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = documents.iter().map(|(text, _)| text.as_str()).collect();
        let vectors = self.embedder.embed_batch(texts).await?;
        if vectors.len() != documents.len() {
            return Err(KilnError::embedding(format!(
                "Embedder returned {} vectors for {} texts",
                vectors.len(),
                documents.len()
            )));
        }

        let records = documents
            .into_iter()
            .map(|(text, mut metadata)| {
                metadata.insert(TEXT_KEY.to_string(), serde_json::Value::String(text));
                metadata
            })
            .collect();

        let ids = self.store.add(vectors, records).await?;
        debug!("Stored {} records", ids.len());
        Ok(ids)
    }

    /// The `k` records nearest to `query`, best first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Retrieved>> {
        let vector = self.embedder.embed(query).await?;
        let hits = self.store.search_one(&vector, k).await?;
        self.resolve(hits).await
    }

    /// Fetch a stored record.
    pub async fn get(&self, id: u64) -> Result<Option<Metadata>> {
        self.store.get(id).await
    }

    /// Persist the index.
    pub async fn save(&self) -> Result<()> {
        self.store.save().await
    }

    async fn resolve(&self, hits: Vec<SearchHit>) -> Result<Vec<Retrieved>> {
        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let metadata = self
                .store
                .get(hit.id)
                .await?
                .ok_or_else(|| KilnError::not_found(format!("record {}", hit.id)))?;
            results.push(Retrieved {
                id: hit.id,
                score: hit.score,
                metadata,
            });
        }
        Ok(results)
    }
}
