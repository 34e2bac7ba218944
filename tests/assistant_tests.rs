use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use vault_assistant::ai::{Completer, Embedder};
use vault_assistant::config::settings::{
    ChunkingConfig, LlmConfig, LoggingConfig, Provider, RetrievalConfig, Settings, StoreConfig,
    VaultConfig,
};
use vault_assistant::error::AssistantError;
use vault_assistant::KnowledgeAssistant;

/// Deterministic embedder over character trigrams, L2-normalized so that
/// squared distance tracks cosine similarity. Texts sharing word stems
/// ("decorator" / "Decorators") land close together.
struct TrigramEmbedder;

impl TrigramEmbedder {
    fn embed_one(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; 64];
        for word in text.to_lowercase().split_whitespace() {
            let letters: Vec<u8> = word.bytes().filter(|b| b.is_ascii_alphanumeric()).collect();
            for gram in letters.windows(3) {
                let mut h = 5381usize;
                for b in gram {
                    h = h.wrapping_mul(33).wrapping_add(*b as usize);
                }
                vector[h % 64] += 1.0;
            }
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for TrigramEmbedder {
    fn model(&self) -> &str {
        "trigram-test"
    }

    async fn embed(
        &self,
        texts: &[String],
    ) -> vault_assistant::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::embed_one(t)).collect())
    }
}

struct CannedCompleter;

#[async_trait]
impl Completer for CannedCompleter {
    async fn complete(
        &self,
        _prompt: &str,
        _temperature: f32,
        _max_tokens: usize,
    ) -> vault_assistant::Result<String> {
        Ok("canned answer".to_string())
    }
}

fn settings(vault: &Path, store: &Path, top_k: usize) -> Settings {
    Settings {
        logging: LoggingConfig { level: "info".to_string() },
        vault: VaultConfig { path: vault.to_path_buf() },
        chunking: ChunkingConfig { chunk_size: 1000, chunk_overlap: 200 },
        retrieval: RetrievalConfig { top_k, similarity_threshold: None },
        store: StoreConfig { path: store.to_path_buf() },
        llm: LlmConfig {
            provider: Provider::Ollama,
            ollama_base_url: None,
            openai_api_key: None,
            embedding_model: "trigram-test".to_string(),
            llm_model: "test-llm".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
        },
    }
}

fn assistant(settings: &Settings) -> KnowledgeAssistant {
    KnowledgeAssistant::with_backends(settings, Arc::new(TrigramEmbedder), Arc::new(CannedCompleter))
        .unwrap()
}

fn write_sample_vault(vault: &Path) {
    std::fs::write(
        vault.join("a.md"),
        "# Python\nPython basics for beginners #python [[Notes]]",
    )
    .unwrap();
    std::fs::write(
        vault.join("b.md"),
        "# Decorators\nDecorators explained with examples #python",
    )
    .unwrap();
}

#[tokio::test]
async fn test_ask_end_to_end_ranks_and_cites() {
    let vault = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    write_sample_vault(vault.path());

    let settings = settings(vault.path(), store.path(), 2);
    let assistant = assistant(&settings);
    assistant.initialize(false).await.unwrap();

    let response = assistant.ask("What is a decorator?", true).await.unwrap();
    assert_eq!(response.answer, "canned answer");
    assert_eq!(response.sources.len(), 2);

    // The note about decorators must outrank the unrelated one.
    assert_eq!(response.sources[0].source, "b.md");
    assert!(response.sources[0].score.unwrap() < response.sources[1].score.unwrap());
    assert!(response.sources[0].tags.contains(&"python".to_string()));
    assert!(response.sources[0].preview.is_some());
    assert_eq!(response.source_chunks.len(), 2);
}

#[tokio::test]
async fn test_ask_without_scores_dedups_sources() {
    let vault = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    write_sample_vault(vault.path());

    let settings = settings(vault.path(), store.path(), 2);
    let assistant = assistant(&settings);
    assistant.initialize(false).await.unwrap();

    let response = assistant.ask("What is a decorator?", false).await.unwrap();
    for source in &response.sources {
        assert!(source.score.is_none());
        assert!(source.preview.is_none());
    }
    let mut names: Vec<_> = response.sources.iter().map(|s| s.source.clone()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), response.sources.len());
}

#[tokio::test]
async fn test_ask_before_initialize_fails() {
    let vault = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    write_sample_vault(vault.path());

    let settings = settings(vault.path(), store.path(), 2);
    let assistant = assistant(&settings);

    assert!(matches!(
        assistant.ask("anything", true).await,
        Err(AssistantError::NotInitialized)
    ));
    assert!(matches!(
        assistant.search_documents("anything", 2).await,
        Err(AssistantError::NotInitialized)
    ));
}

#[tokio::test]
async fn test_second_run_loads_persisted_index() {
    let vault = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    write_sample_vault(vault.path());

    let settings = settings(vault.path(), store.path(), 2);
    let first = assistant(&settings);
    first.initialize(false).await.unwrap();
    drop(first);

    // Empty the vault: a rebuild would now fail, so a successful second
    // initialize proves the persisted index was loaded instead.
    std::fs::remove_file(vault.path().join("a.md")).unwrap();
    std::fs::remove_file(vault.path().join("b.md")).unwrap();

    let second = assistant(&settings);
    second.initialize(false).await.unwrap();

    let stats = second.get_vector_store_stats().await;
    assert_eq!(stats.status, "ready");
    assert_eq!(stats.num_documents, 2);
    assert_eq!(stats.embedding_model, "trigram-test");
}

#[tokio::test]
async fn test_force_rebuild_reindexes_the_vault() {
    let vault = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    write_sample_vault(vault.path());

    let settings = settings(vault.path(), store.path(), 2);
    let assistant = assistant(&settings);
    assistant.initialize(false).await.unwrap();
    assert_eq!(assistant.get_vector_store_stats().await.num_documents, 2);

    std::fs::write(vault.path().join("c.md"), "# Rust\nOwnership and borrowing #rust").unwrap();
    assistant.rebuild_index().await.unwrap();

    let stats = assistant.get_vector_store_stats().await;
    assert_eq!(stats.num_documents, 3);

    let response = assistant.ask("ownership and borrowing", true).await.unwrap();
    assert_eq!(response.sources[0].source, "c.md");
}

#[tokio::test]
async fn test_search_documents_returns_scored_matches() {
    let vault = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    write_sample_vault(vault.path());

    let settings = settings(vault.path(), store.path(), 2);
    let assistant = assistant(&settings);
    assistant.initialize(false).await.unwrap();

    let matches = assistant.search_documents("decorators explained", 1).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].source, "b.md");
    assert!(matches[0].content.contains("Decorators explained"));
    assert!(matches[0].tags.contains(&"python".to_string()));
}

#[tokio::test]
async fn test_status_reflects_lifecycle() {
    let vault = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    write_sample_vault(vault.path());

    let settings = settings(vault.path(), store.path(), 2);
    let assistant = assistant(&settings);

    let before = assistant.get_status().await;
    assert!(!before.initialized);
    assert!(before.vault_stats.is_none());
    assert_eq!(before.vector_store_stats.status, "uninitialized");

    assistant.initialize(false).await.unwrap();

    let after = assistant.get_status().await;
    assert!(after.initialized);
    assert_eq!(after.vault_stats.unwrap().total_files, 2);
    assert_eq!(after.vector_store_stats.status, "ready");
    assert_eq!(after.top_k, 2);
}

#[tokio::test]
async fn test_missing_vault_rejected_at_construction() {
    let store = TempDir::new().unwrap();
    let settings = settings(Path::new("/nonexistent/vault"), store.path(), 2);

    assert!(matches!(
        KnowledgeAssistant::new(&settings),
        Err(AssistantError::VaultNotFound(_))
    ));
}

#[tokio::test]
async fn test_update_system_prompt_requires_placeholders() {
    let vault = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    write_sample_vault(vault.path());

    let settings = settings(vault.path(), store.path(), 2);
    let assistant = assistant(&settings);

    assert!(matches!(
        assistant.update_system_prompt("missing both").await,
        Err(AssistantError::InvalidTemplate)
    ));
    assistant
        .update_system_prompt("Context: {context}\nQ: {question}")
        .await
        .unwrap();
}
