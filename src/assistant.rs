use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ai::{build_backends, Embedder};
use crate::config::Settings;
use crate::engine::{QueryResponse, RagEngine};
use crate::error::{AssistantError, Result};
use crate::index::{IndexStats, VectorStoreManager};
use crate::logger::Logger;
use crate::vault::{VaultLoader, VaultStats};

/// One document match from a raw retrieval query (no completion involved).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMatch {
    pub content: String,
    pub source: String,
    pub score: f32,
    pub tags: Vec<String>,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub initialized: bool,
    pub vault_path: String,
    pub vault_stats: Option<VaultStats>,
    pub vector_store_stats: IndexStats,
    pub llm_model: String,
    pub embedding_model: String,
    pub top_k: usize,
}

/// Facade over the loader, vector store and RAG engine. This is the whole
/// surface the UI layer consumes.
pub struct KnowledgeAssistant {
    loader: VaultLoader,
    store: Arc<VectorStoreManager>,
    engine: RagEngine,
    vault_path: String,
    llm_model: String,
    embedding_model: String,
    top_k: usize,
    similarity_threshold: Option<f32>,
    initialized: AtomicBool,
    logger: Logger,
}

impl KnowledgeAssistant {
    /// Wires up all collaborators from settings. Backend providers are
    /// chosen here, once; nothing probes at call time.
    pub fn new(settings: &Settings) -> Result<Self> {
        if !settings.vault.path.exists() {
            return Err(AssistantError::VaultNotFound(settings.vault.path.clone()));
        }

        let (embedder, completer) = build_backends(settings)?;
        Self::with_backends(settings, embedder, completer)
    }

    /// Same wiring with caller-supplied backends; used by tests to inject
    /// deterministic embedding and completion.
    pub fn with_backends(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn crate::ai::Completer>,
    ) -> Result<Self> {
        let loader = VaultLoader::new(
            settings.vault.path.clone(),
            settings.chunking.chunk_size,
            settings.chunking.chunk_overlap,
        )?;
        let store = Arc::new(VectorStoreManager::new(settings.store.path.clone(), embedder));
        let engine = RagEngine::new(
            store.clone(),
            completer,
            settings.retrieval.top_k,
            settings.llm.temperature,
            settings.llm.max_tokens,
        );

        Ok(Self {
            loader,
            store,
            engine,
            vault_path: settings.vault.path.to_string_lossy().to_string(),
            llm_model: settings.llm.llm_model.clone(),
            embedding_model: settings.llm.embedding_model.clone(),
            top_k: settings.retrieval.top_k,
            similarity_threshold: settings.retrieval.similarity_threshold,
            initialized: AtomicBool::new(false),
            logger: Logger::new("KnowledgeAssistant"),
        })
    }

    /// Loads the persisted index, or builds one from the vault when none
    /// exists (or a rebuild is forced).
    pub async fn initialize(&self, force_rebuild: bool) -> Result<()> {
        self.logger.info("Initializing knowledge assistant");

        if !force_rebuild && self.store.load().await? {
            self.logger.info("Existing vector index loaded");
        } else {
            self.build_vector_store().await?;
        }

        self.initialized.store(true, Ordering::SeqCst);
        self.logger.info("Knowledge assistant ready");
        Ok(())
    }

    async fn build_vector_store(&self) -> Result<()> {
        let chunks = self.loader.load_documents().await?;
        if chunks.is_empty() {
            return Err(AssistantError::EmptyInput);
        }
        self.store.create(chunks).await?;
        self.store.save().await
    }

    /// Answers a question from the vault. `include_scores` controls whether
    /// citations carry per-chunk scores and previews or are deduplicated
    /// per file.
    pub async fn ask(&self, question: &str, include_scores: bool) -> Result<QueryResponse> {
        self.ensure_initialized()?;
        self.engine.ask(question, include_scores).await
    }

    /// Drops the index and rebuilds it from the vault. Queries arriving
    /// while the store is empty get `UninitializedIndex`, not a crash.
    pub async fn rebuild_index(&self) -> Result<()> {
        self.logger.info("Rebuilding vector index");
        self.store.clear().await?;
        self.build_vector_store().await?;
        self.initialized.store(true, Ordering::SeqCst);
        self.logger.info("Vector index rebuilt");
        Ok(())
    }

    /// Raw retrieval without answer synthesis. The configured similarity
    /// threshold applies here, so fewer than `k` matches may come back.
    pub async fn search_documents(&self, query: &str, k: usize) -> Result<Vec<DocumentMatch>> {
        self.ensure_initialized()?;
        let results = self
            .store
            .similarity_search(query, k, self.similarity_threshold)
            .await?;
        Ok(results
            .into_iter()
            .map(|r| DocumentMatch {
                content: r.chunk.text,
                source: r.chunk.metadata.source,
                score: r.score,
                tags: r.chunk.metadata.tags.into_iter().collect(),
                links: r.chunk.metadata.links.into_iter().collect(),
            })
            .collect())
    }

    pub fn get_vault_stats(&self) -> Result<VaultStats> {
        self.loader.get_vault_stats()
    }

    pub async fn get_vector_store_stats(&self) -> IndexStats {
        self.store.stats().await
    }

    pub async fn get_status(&self) -> Status {
        let initialized = self.initialized.load(Ordering::SeqCst);
        Status {
            initialized,
            vault_path: self.vault_path.clone(),
            vault_stats: if initialized { self.loader.get_vault_stats().ok() } else { None },
            vector_store_stats: self.store.stats().await,
            llm_model: self.llm_model.clone(),
            embedding_model: self.embedding_model.clone(),
            top_k: self.top_k,
        }
    }

    pub async fn update_system_prompt(&self, template: &str) -> Result<()> {
        self.engine.update_prompt(template).await
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AssistantError::NotInitialized)
        }
    }
}
