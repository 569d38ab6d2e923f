//! Exact vector index with on-disk persistence.
//!
//! Vectors live in one row-major `Vec<f32>`; every search scans all rows.
//! When bound to a directory the index is stored as two files:
//!
//! - `index.bin`: bincode of the dimension, metric and vectors;
//! - `metadata.json`: a JSON array whose position `i` holds the metadata
//!   of handle `i`.
//!
//! A save stages both files under a `.tmp` name, renames the metadata into
//! place and then the index. `index.bin` is the commit point: a save cut
//! short between the two renames is finished by the next `load`, and one cut
//! short earlier is discarded.

use async_trait::async_trait;
use kiln_core::{
    KilnError, Metadata, Result, SearchHit,
    config::VectorStoreConfig,
    traits::{DistanceMetric, VectorIndex},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// File holding the vectors.
pub const INDEX_FILE: &str = "index.bin";

/// File holding the metadata records.
pub const METADATA_FILE: &str = "metadata.json";

const FORMAT_VERSION: u32 = 1;

/// Exact (brute force) vector index.
///
/// Handles are assigned sequentially from the current number of vectors,
/// so the first vector ever added is `0`.
///
/// # Examples
///
/// ```rust,no_run
/// use kiln_integrations::FlatIndexStore;
/// use kiln_core::traits::{DistanceMetric, VectorIndex};
/// use kiln_core::types::metadata;
///
/// # async fn example() -> kiln_core::Result<()> {
/// let store = FlatIndexStore::new("data/vectorstore", DistanceMetric::Cosine);
/// store.load(3).await?;
///
/// let ids = store
///     .add(vec![vec![1.0, 0.0, 0.0]], vec![metadata([("text", "hello")])])
///     .await?;
/// let hits = store.search_one(&[1.0, 0.0, 0.0], 1).await?;
/// assert_eq!(hits[0].id, ids[0]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FlatIndexStore {
    dir: Option<PathBuf>,
    metric: DistanceMetric,
    autosave: bool,
    state: RwLock<Option<IndexState>>,
    // Serializes mutations with their saves.
    write_lock: tokio::sync::Mutex<()>,
}

#[derive(Debug, Clone, Default)]
struct IndexState {
    dimension: usize,
    vectors: Vec<f32>,
    metadata: Vec<Metadata>,
}

impl IndexState {
    fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            metadata: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.metadata.len()
    }

    fn row(&self, index: usize) -> &[f32] {
        &self.vectors[index * self.dimension..(index + 1) * self.dimension]
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(KilnError::validation(format!(
                "Vector dimension {} does not match index dimension {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    dimension: u32,
    metric: DistanceMetric,
    vectors: Vec<f32>,
}

impl FlatIndexStore {
    /// Create an index persisted under `dir`. Nothing is read until [`VectorIndex::load`].
    pub fn new<P: Into<PathBuf>>(dir: P, metric: DistanceMetric) -> Self {
        Self {
            dir: Some(dir.into()),
            metric,
            autosave: true,
            state: RwLock::new(None),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Create an index that is never written to disk.
    pub fn in_memory(metric: DistanceMetric) -> Self {
        Self {
            dir: None,
            metric,
            autosave: false,
            state: RwLock::new(None),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Create an index from configuration.
    pub fn from_config(config: &VectorStoreConfig) -> Self {
        match config {
            VectorStoreConfig::Flat {
                path,
                metric,
                autosave,
            } => Self::new(path.clone(), *metric).with_autosave(*autosave),
            VectorStoreConfig::Memory { metric } => Self::in_memory(*metric),
        }
    }

    /// Enable or disable saving after every mutation.
    #[must_use]
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave && self.dir.is_some();
        self
    }

    /// The directory the index is persisted in.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// The similarity metric.
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of stored vectors; zero before `load`.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .ok()
            .and_then(|state| state.as_ref().map(IndexState::len))
            .unwrap_or(0)
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, Option<IndexState>>> {
        self.state
            .read()
            .map_err(|_| KilnError::vector_store("index lock poisoned"))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, Option<IndexState>>> {
        self.state
            .write()
            .map_err(|_| KilnError::vector_store("index lock poisoned"))
    }

    async fn read_from_disk(&self, dir: &Path, dimension: usize) -> Result<Option<IndexState>> {
        recover_staged(dir).await?;

        let index_path = dir.join(INDEX_FILE);
        if !tokio::fs::try_exists(&index_path).await? {
            return Ok(None);
        }

        let bytes = tokio::fs::read(&index_path).await?;
        let file: IndexFile = bincode::deserialize(&bytes).map_err(|e| {
            KilnError::vector_store(format!("Corrupt index file {}: {e}", index_path.display()))
        })?;

        if file.version != FORMAT_VERSION {
            return Err(KilnError::vector_store(format!(
                "Unsupported index format version {} in {}",
                file.version,
                index_path.display()
            )));
        }

        let stored_dimension = file.dimension as usize;
        if stored_dimension != dimension {
            return Err(KilnError::validation(format!(
                "Stored index has dimension {stored_dimension}, requested {dimension}"
            )));
        }

        if file.metric != self.metric {
            warn!(
                "Index at {} was built with {:?}, searching with {:?}",
                dir.display(),
                file.metric,
                self.metric
            );
        }

        if file.vectors.len() % dimension != 0 {
            return Err(KilnError::vector_store(format!(
                "Index file {} holds a partial vector",
                index_path.display()
            )));
        }
        let count = file.vectors.len() / dimension;

        let metadata_path = dir.join(METADATA_FILE);
        let metadata: Vec<Metadata> = match tokio::fs::read(&metadata_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && count == 0 => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        if metadata.len() != count {
            return Err(KilnError::vector_store(format!(
                "Index holds {count} vectors but {} metadata records",
                metadata.len()
            )));
        }

        Ok(Some(IndexState {
            dimension,
            vectors: file.vectors,
            metadata,
        }))
    }

    fn snapshot(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let guard = self.read_state()?;
        let state = guard.as_ref().ok_or_else(not_loaded)?;

        let file = IndexFile {
            version: FORMAT_VERSION,
            dimension: u32::try_from(state.dimension)
                .map_err(|_| KilnError::validation("Index dimension exceeds u32"))?,
            metric: self.metric,
            vectors: state.vectors.clone(),
        };
        let index_bytes = bincode::serialize(&file)
            .map_err(|e| KilnError::vector_store(format!("Failed to encode index: {e}")))?;
        let metadata_bytes = serde_json::to_vec(&state.metadata)?;

        Ok((index_bytes, metadata_bytes))
    }

    /// Write both files. Callers hold `write_lock`.
    async fn persist(&self) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let (index_bytes, metadata_bytes) = self.snapshot()?;

        let index_path = dir.join(INDEX_FILE);
        let metadata_path = dir.join(METADATA_FILE);

        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(staged(&metadata_path), &metadata_bytes).await?;
        tokio::fs::write(staged(&index_path), &index_bytes).await?;
        tokio::fs::rename(staged(&metadata_path), &metadata_path).await?;
        tokio::fs::rename(staged(&index_path), &index_path).await?;

        debug!("Saved flat index to {}", dir.display());
        Ok(())
    }

    async fn persist_if_enabled(&self) -> Result<()> {
        if self.autosave {
            self.persist().await?;
        }
        Ok(())
    }

    fn truncate(&self, len: usize) -> Result<()> {
        let mut guard = self.write_state()?;
        if let Some(state) = guard.as_mut() {
            state.vectors.truncate(len * state.dimension);
            state.metadata.truncate(len);
        }
        Ok(())
    }
}

fn not_loaded() -> KilnError {
    KilnError::vector_store("index not loaded")
}

fn staged(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Settle a save that stopped before its last rename.
///
/// A staged metadata file means the renames never started, so whatever was
/// staged is dropped. A staged index alone means the metadata is already in
/// place and only the index rename is missing.
async fn recover_staged(dir: &Path) -> Result<()> {
    let staged_index = staged(&dir.join(INDEX_FILE));
    let staged_metadata = staged(&dir.join(METADATA_FILE));

    if tokio::fs::try_exists(&staged_metadata).await? {
        warn!("Discarding unfinished save in {}", dir.display());
        tokio::fs::remove_file(&staged_metadata).await?;
        if tokio::fs::try_exists(&staged_index).await? {
            tokio::fs::remove_file(&staged_index).await?;
        }
    } else if tokio::fs::try_exists(&staged_index).await? {
        warn!("Completing interrupted save in {}", dir.display());
        tokio::fs::rename(&staged_index, dir.join(INDEX_FILE)).await?;
    }
    Ok(())
}

#[async_trait]
impl VectorIndex for FlatIndexStore {
    async fn load(&self, dimension: usize) -> Result<()> {
        if dimension == 0 {
            return Err(KilnError::validation("Index dimension must be greater than 0"));
        }

        let state = match &self.dir {
            Some(dir) => self.read_from_disk(dir, dimension).await?,
            None => {
                let guard = self.read_state()?;
                match guard.as_ref() {
                    Some(existing) if existing.dimension != dimension => {
                        return Err(KilnError::validation(format!(
                            "Index has dimension {}, requested {dimension}",
                            existing.dimension
                        )));
                    }
                    Some(existing) => Some(existing.clone()),
                    None => None,
                }
            }
        };

        let state = match state {
            Some(state) => {
                info!(
                    "Loaded flat index with {} vectors of dimension {}",
                    state.len(),
                    dimension
                );
                state
            }
            None => {
                debug!("Creating empty flat index of dimension {}", dimension);
                IndexState::empty(dimension)
            }
        };

        *self.write_state()? = Some(state);
        Ok(())
    }

    async fn add(&self, vectors: Vec<Vec<f32>>, metadata: Vec<Metadata>) -> Result<Vec<u64>> {
        if vectors.len() != metadata.len() {
            return Err(KilnError::validation(format!(
                "Got {} vectors but {} metadata records",
                vectors.len(),
                metadata.len()
            )));
        }

        let _writer = self.write_lock.lock().await;
        let (start, ids) = {
            let mut guard = self.write_state()?;
            let state = guard.as_mut().ok_or_else(not_loaded)?;

            for vector in &vectors {
                state.check_dimension(vector)?;
            }

            let start = state.len();
            state.vectors.reserve(vectors.len() * state.dimension);
            for vector in &vectors {
                state.vectors.extend_from_slice(vector);
            }
            state.metadata.extend(metadata);

            (start, (start as u64..state.len() as u64).collect::<Vec<_>>())
        };

        if ids.is_empty() {
            return Ok(ids);
        }

        if let Err(e) = self.persist_if_enabled().await {
            warn!("Save failed, dropping {} new vectors: {}", ids.len(), e);
            self.truncate(start)?;
            return Err(e);
        }

        debug!("Added {} vectors to flat index", ids.len());
        Ok(ids)
    }

    async fn search(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<Vec<SearchHit>>> {
        let guard = self.read_state()?;
        let state = guard.as_ref().ok_or_else(not_loaded)?;

        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            state.check_dimension(query)?;

            let mut hits: Vec<SearchHit> = (0..state.len())
                .map(|i| SearchHit::new(i as u64, self.metric.similarity(query, state.row(i))))
                .collect();

            // Stable sort keeps insertion order among equal scores.
            hits.sort_by(|a, b| b.score.total_cmp(&a.score));
            hits.truncate(k);
            results.push(hits);
        }

        debug!(
            "Searched flat index with {} queries, k = {}",
            queries.len(),
            k
        );
        Ok(results)
    }

    async fn get(&self, id: u64) -> Result<Option<Metadata>> {
        let guard = self.read_state()?;
        let state = guard.as_ref().ok_or_else(not_loaded)?;

        Ok(usize::try_from(id)
            .ok()
            .and_then(|index| state.metadata.get(index))
            .cloned())
    }

    async fn count(&self) -> Result<usize> {
        let guard = self.read_state()?;
        Ok(guard.as_ref().ok_or_else(not_loaded)?.len())
    }

    fn dimension(&self) -> Option<usize> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.as_ref().map(|s| s.dimension))
    }

    async fn save(&self) -> Result<()> {
        let _writer = self.write_lock.lock().await;
        self.persist().await
    }

    async fn clear(&self) -> Result<()> {
        let _writer = self.write_lock.lock().await;
        let (vectors, metadata) = {
            let mut guard = self.write_state()?;
            let state = guard.as_mut().ok_or_else(not_loaded)?;
            (
                std::mem::take(&mut state.vectors),
                std::mem::take(&mut state.metadata),
            )
        };

        if let Err(e) = self.persist_if_enabled().await {
            if let Some(state) = self.write_state()?.as_mut() {
                state.vectors = vectors;
                state.metadata = metadata;
            }
            return Err(e);
        }

        info!("Cleared flat index");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "FlatIndexStore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::types::metadata;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn text(value: &str) -> Metadata {
        metadata([("text", value)])
    }

    #[tokio::test]
    async fn test_operations_before_load_fail() {
        let store = FlatIndexStore::in_memory(DistanceMetric::Cosine);

        let err = store.add(vec![vec![1.0]], vec![text("a")]).await.unwrap_err();
        assert!(err.to_string().contains("index not loaded"));
        assert!(store.search_one(&[1.0], 1).await.is_err());
        assert!(store.get(0).await.is_err());
        assert!(store.dimension().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = FlatIndexStore::in_memory(DistanceMetric::Cosine);
        store.load(2).await.unwrap();

        let first = store
            .add(vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![text("a"), text("b")])
            .await
            .unwrap();
        let second = store.add(vec![vec![1.0, 1.0]], vec![text("c")]).await.unwrap();

        assert_eq!(first, vec![0, 1]);
        assert_eq!(second, vec![2]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(2).await.unwrap(), Some(text("c")));
        assert_eq!(store.get(3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_validation() {
        let store = FlatIndexStore::in_memory(DistanceMetric::Cosine);
        store.load(3).await.unwrap();

        let mismatch = store.add(vec![vec![1.0, 0.0]], vec![text("a")]).await;
        assert!(matches!(mismatch, Err(KilnError::Validation { .. })));

        let lengths = store.add(vec![vec![1.0, 0.0, 0.0]], vec![]).await;
        assert!(matches!(lengths, Err(KilnError::Validation { .. })));

        // A rejected batch leaves the index untouched.
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_order_and_truncation() {
        let store = FlatIndexStore::in_memory(DistanceMetric::Cosine);
        store.load(2).await.unwrap();
        store
            .add(
                vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7], vec![1.0, 0.0]],
                vec![text("up"), text("right"), text("diag"), text("right again")],
            )
            .await
            .unwrap();

        let hits = store.search_one(&[1.0, 0.0], 3).await.unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.id).collect();

        // Equal scores keep insertion order.
        assert_eq!(ids, vec![1, 3, 2]);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));

        assert!(store.search_one(&[1.0, 0.0], 0).await.unwrap().is_empty());
        assert_eq!(store.search_one(&[1.0, 0.0], 10).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_batch_search() {
        let store = FlatIndexStore::in_memory(DistanceMetric::DotProduct);
        store.load(2).await.unwrap();
        store
            .add(vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![text("x"), text("y")])
            .await
            .unwrap();

        let results = store
            .search(&[vec![0.0, 2.0], vec![3.0, 0.0]], 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0][0].id, 1);
        assert_eq!(results[1][0].id, 0);
        assert_eq!(results[1][0].score, 3.0);
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("vs");

        let store = FlatIndexStore::new(&dir, DistanceMetric::Cosine);
        store.load(2).await.unwrap();
        store
            .add(vec![vec![0.6, 0.8], vec![1.0, 0.0]], vec![text("a"), text("b")])
            .await
            .unwrap();

        assert!(dir.join(INDEX_FILE).exists());
        assert!(dir.join(METADATA_FILE).exists());

        let reopened = FlatIndexStore::new(&dir, DistanceMetric::Cosine);
        reopened.load(2).await.unwrap();

        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get(1).await.unwrap(), Some(text("b")));
        let hits = reopened.search_one(&[0.6, 0.8], 1).await.unwrap();
        assert_eq!(hits[0].id, 0);

        let next = reopened.add(vec![vec![0.0, 1.0]], vec![text("c")]).await.unwrap();
        assert_eq!(next, vec![2]);
    }

    #[tokio::test]
    async fn test_reload_with_other_dimension_fails() {
        let temp_dir = TempDir::new().unwrap();

        let store = FlatIndexStore::new(temp_dir.path(), DistanceMetric::Cosine);
        store.load(4).await.unwrap();
        store.save().await.unwrap();

        let reopened = FlatIndexStore::new(temp_dir.path(), DistanceMetric::Cosine);
        let result = reopened.load(8).await;
        assert!(matches!(result, Err(KilnError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_without_autosave_nothing_is_written() {
        let temp_dir = TempDir::new().unwrap();

        let store =
            FlatIndexStore::new(temp_dir.path(), DistanceMetric::Cosine).with_autosave(false);
        store.load(1).await.unwrap();
        store.add(vec![vec![1.0]], vec![text("a")]).await.unwrap();
        assert!(!temp_dir.path().join(INDEX_FILE).exists());

        store.save().await.unwrap();
        assert!(temp_dir.path().join(INDEX_FILE).exists());
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back_add() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("vs");

        let store = FlatIndexStore::new(&dir, DistanceMetric::Cosine);
        store.load(1).await.unwrap();

        // A plain file where the directory should go makes every save fail.
        std::fs::write(&dir, b"in the way").unwrap();

        assert!(store.add(vec![vec![1.0]], vec![text("a")]).await.is_err());
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.add(vec![vec![1.0]], vec![text("a")]).await.is_err());
        assert_eq!(store.count().await.unwrap(), 0);

        std::fs::remove_file(&dir).unwrap();
        let ids = store.add(vec![vec![1.0]], vec![text("a")]).await.unwrap();
        assert_eq!(ids, vec![0]);
        assert_eq!(store.get(0).await.unwrap(), Some(text("a")));
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back_clear() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("vs");

        let store = FlatIndexStore::new(&dir, DistanceMetric::Cosine);
        store.load(1).await.unwrap();
        store.add(vec![vec![1.0]], vec![text("a")]).await.unwrap();

        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, b"in the way").unwrap();

        assert!(store.clear().await.is_err());
        assert_eq!(store.get(0).await.unwrap(), Some(text("a")));
    }

    /// Stage a three-record index the way `persist` does, stopping after
    /// `renames` of its two renames.
    async fn interrupted_save(dir: &Path, renames: usize) {
        let staging = FlatIndexStore::in_memory(DistanceMetric::Cosine);
        staging.load(1).await.unwrap();
        staging
            .add(vec![vec![1.0], vec![2.0], vec![3.0]], vec![text("a"), text("b"), text("c")])
            .await
            .unwrap();
        let (index_bytes, metadata_bytes) = staging.snapshot().unwrap();

        let metadata_path = dir.join(METADATA_FILE);
        std::fs::write(staged(&metadata_path), metadata_bytes).unwrap();
        std::fs::write(staged(&dir.join(INDEX_FILE)), index_bytes).unwrap();
        if renames > 0 {
            std::fs::rename(staged(&metadata_path), &metadata_path).unwrap();
        }
    }

    async fn saved_pair(dir: &Path) {
        let store = FlatIndexStore::new(dir, DistanceMetric::Cosine);
        store.load(1).await.unwrap();
        store
            .add(vec![vec![1.0], vec![2.0]], vec![text("a"), text("b")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_load_finishes_save_cut_between_renames() {
        let temp_dir = TempDir::new().unwrap();
        saved_pair(temp_dir.path()).await;
        interrupted_save(temp_dir.path(), 1).await;

        let reopened = FlatIndexStore::new(temp_dir.path(), DistanceMetric::Cosine);
        reopened.load(1).await.unwrap();

        assert_eq!(reopened.len(), 3);
        assert_eq!(reopened.get(2).await.unwrap(), Some(text("c")));
        assert!(!staged(&temp_dir.path().join(INDEX_FILE)).exists());
    }

    #[tokio::test]
    async fn test_load_discards_save_cut_before_renames() {
        let temp_dir = TempDir::new().unwrap();
        saved_pair(temp_dir.path()).await;
        interrupted_save(temp_dir.path(), 0).await;

        let reopened = FlatIndexStore::new(temp_dir.path(), DistanceMetric::Cosine);
        reopened.load(1).await.unwrap();

        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get(1).await.unwrap(), Some(text("b")));
        assert!(!staged(&temp_dir.path().join(INDEX_FILE)).exists());
        assert!(!staged(&temp_dir.path().join(METADATA_FILE)).exists());
    }

    #[tokio::test]
    async fn test_clear() {
        let store = FlatIndexStore::in_memory(DistanceMetric::Euclidean);
        store.load(1).await.unwrap();
        store.add(vec![vec![1.0]], vec![text("a")]).await.unwrap();

        store.clear().await.unwrap();

        assert!(store.is_empty());
        assert_eq!(store.dimension(), Some(1));
        assert_eq!(store.add(vec![vec![2.0]], vec![text("b")]).await.unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = VectorStoreConfig::flat(temp_dir.path())
            .with_metric(DistanceMetric::DotProduct)
            .with_autosave(false);

        let store = FlatIndexStore::from_config(&config);
        assert_eq!(store.metric(), DistanceMetric::DotProduct);
        assert_eq!(store.dir(), Some(temp_dir.path()));

        let memory = FlatIndexStore::from_config(&VectorStoreConfig::memory());
        assert!(memory.dir().is_none());
    }
}
