pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::ai::Embedder;
use crate::error::{AssistantError, Result};
use crate::logger::Logger;
use crate::vault::Chunk;

pub use store::{IndexMetadata, RetrievalResult, VectorIndex};

/// Lifecycle of the in-memory index relative to the persisted artifacts.
///
/// `Dirty` means the memory copy has changes `save` has not written yet;
/// trusting the on-disk state requires `Loaded`.
enum IndexState {
    Absent,
    Loaded(VectorIndex),
    Dirty(VectorIndex),
}

impl IndexState {
    fn index(&self) -> Option<&VectorIndex> {
        match self {
            IndexState::Absent => None,
            IndexState::Loaded(index) | IndexState::Dirty(index) => Some(index),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub status: String,
    pub num_documents: usize,
    pub embedding_model: String,
}

/// Owns the vector index: builds it from chunks, persists and reloads it,
/// and serves similarity queries. Mutations take the write lock; searches
/// share the read lock.
pub struct VectorStoreManager {
    store_path: PathBuf,
    embedder: Arc<dyn Embedder>,
    state: RwLock<IndexState>,
    logger: Logger,
}

impl VectorStoreManager {
    pub fn new(store_path: PathBuf, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store_path,
            embedder,
            state: RwLock::new(IndexState::Absent),
            logger: Logger::new("VectorStoreManager"),
        }
    }

    /// Builds a fresh index from `chunks`. In memory only until `save`.
    pub async fn create(&self, chunks: Vec<Chunk>) -> Result<()> {
        if chunks.is_empty() {
            return Err(AssistantError::EmptyInput);
        }

        self.logger
            .info(&format!("Building vector index from {} chunks", chunks.len()));

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let mut index = VectorIndex::new(self.embedder.model().to_string());
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            index.push(chunk, vector);
        }

        let mut state = self.state.write().await;
        *state = IndexState::Dirty(index);
        self.logger.info("Vector index built");
        Ok(())
    }

    /// Persists the current index as two artifacts under the store path.
    ///
    /// A failed write leaves the in-memory index untouched (still `Dirty`),
    /// so the caller can keep searching and retry the save.
    pub async fn save(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let index = match &*state {
            IndexState::Absent => return Err(AssistantError::UninitializedIndex),
            IndexState::Loaded(index) | IndexState::Dirty(index) => index,
        };

        let metadata = index.save_to(&self.store_path)?;
        self.logger.info(&format!(
            "Saved vector index ({} documents) to {}",
            metadata.num_documents,
            self.store_path.display()
        ));

        // Memory and disk agree again.
        let current = std::mem::replace(&mut *state, IndexState::Absent);
        if let IndexState::Dirty(index) | IndexState::Loaded(index) = current {
            *state = IndexState::Loaded(index);
        }
        Ok(())
    }

    /// Loads the persisted index. `Ok(false)` when no index exists yet.
    ///
    /// An index built with a different embedding model than the configured
    /// one is rejected rather than silently reused.
    pub async fn load(&self) -> Result<bool> {
        let loaded = match VectorIndex::load_from(&self.store_path)? {
            None => {
                self.logger.info("No existing vector index found");
                return Ok(false);
            }
            Some((index, metadata)) => {
                if metadata.embedding_model != self.embedder.model() {
                    return Err(AssistantError::IndexLoad(format!(
                        "index was built with embedding model '{}' but '{}' is configured",
                        metadata.embedding_model,
                        self.embedder.model()
                    )));
                }
                self.logger.info(&format!(
                    "Loaded vector index with {} documents",
                    metadata.num_documents
                ));
                index
            }
        };

        let mut state = self.state.write().await;
        *state = IndexState::Loaded(loaded);
        Ok(true)
    }

    /// Embeds and appends chunks to an existing index.
    pub async fn add(&self, chunks: Vec<Chunk>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let mut state = self.state.write().await;
        let mut index = match std::mem::replace(&mut *state, IndexState::Absent) {
            IndexState::Absent => return Err(AssistantError::UninitializedIndex),
            IndexState::Loaded(index) | IndexState::Dirty(index) => index,
        };
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            index.push(chunk, vector);
        }
        self.logger
            .info(&format!("Index now holds {} documents", index.len()));
        *state = IndexState::Dirty(index);
        Ok(())
    }

    /// Top-`k` nearest chunks by distance, ascending. With a threshold the
    /// retrieved candidates are post-filtered to `score <= threshold`, so
    /// fewer than `k` results (or none) may come back.
    ///
    /// The query is embedded before the state lock is taken, so a slow
    /// backend call never stalls concurrent mutations.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<RetrievalResult>> {
        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        if vectors.is_empty() {
            return Err(AssistantError::Backend("embedder returned no vector for query".into()));
        }
        let query_vector = vectors.remove(0);

        let state = self.state.read().await;
        let index = state.index().ok_or(AssistantError::UninitializedIndex)?;

        let mut results = index.search(&query_vector, k);
        if let Some(threshold) = score_threshold {
            results.retain(|r| r.score <= threshold);
        }
        Ok(results)
    }

    pub async fn stats(&self) -> IndexStats {
        let state = self.state.read().await;
        match state.index() {
            None => IndexStats {
                status: "uninitialized".to_string(),
                num_documents: 0,
                embedding_model: self.embedder.model().to_string(),
            },
            Some(index) => IndexStats {
                status: "ready".to_string(),
                num_documents: index.len(),
                embedding_model: index.embedding_model.clone(),
            },
        }
    }

    /// Drops the in-memory index and deletes both artifacts. Idempotent.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        *state = IndexState::Absent;
        VectorIndex::remove_artifacts(&self.store_path)?;
        self.logger.info("Vector index cleared");
        Ok(())
    }
}
