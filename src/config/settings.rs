use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AssistantError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub vault: VaultConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub store: StoreConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub similarity_threshold: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: PathBuf,
}

/// Which backend serves embedding and completion requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Ollama,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: Provider,
    pub ollama_base_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub embedding_model: String,
    pub llm_model: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200 }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("VAULT_ASSISTANT").separator("__"))
            .build()
            .map_err(|e| AssistantError::Config(e.to_string()))?;

        let settings: Settings = settings
            .try_deserialize()
            .map_err(|e| AssistantError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(AssistantError::Config("chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(AssistantError::Config(
                "chunk_overlap must be smaller than chunk_size".into(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(AssistantError::Config("top_k must be positive".into()));
        }
        if self.llm.provider == Provider::OpenAi
            && self.llm.openai_api_key.as_deref().unwrap_or("").is_empty()
        {
            return Err(AssistantError::Config(
                "openai_api_key is required when provider is openai".into(),
            ));
        }
        Ok(())
    }

    /// Base URL for the local model server, with the Ollama default.
    pub fn ollama_base_url(&self) -> String {
        self.llm
            .ollama_base_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_settings() -> Settings {
        Settings {
            logging: LoggingConfig { level: "info".to_string() },
            vault: VaultConfig { path: PathBuf::from("./vault") },
            chunking: ChunkingConfig { chunk_size: 1000, chunk_overlap: 200 },
            retrieval: RetrievalConfig { top_k: 5, similarity_threshold: Some(0.7) },
            store: StoreConfig { path: PathBuf::from("./data/vector_store") },
            llm: LlmConfig {
                provider: Provider::Ollama,
                ollama_base_url: None,
                openai_api_key: None,
                embedding_model: "nomic-embed-text".to_string(),
                llm_model: "llama3.1".to_string(),
                temperature: 0.7,
                max_tokens: 2000,
            },
        }
    }

    #[test]
    fn test_settings_serialization() {
        let settings = sample_settings();

        let serialized = serde_json::to_string(&settings).unwrap();
        let deserialized: Settings = serde_json::from_str(&serialized).unwrap();

        assert_eq!(settings.logging.level, deserialized.logging.level);
        assert_eq!(settings.chunking.chunk_size, deserialized.chunking.chunk_size);
        assert_eq!(settings.retrieval.top_k, deserialized.retrieval.top_k);
        assert_eq!(settings.llm.provider, deserialized.llm.provider);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        let mut settings = sample_settings();
        settings.chunking.chunk_overlap = 1000;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_openai_requires_api_key() {
        let mut settings = sample_settings();
        settings.llm.provider = Provider::OpenAi;
        assert!(settings.validate().is_err());

        settings.llm.openai_api_key = Some("sk-test".to_string());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_ollama_base_url_default() {
        let settings = sample_settings();
        assert_eq!(settings.ollama_base_url(), "http://localhost:11434");
    }
}
