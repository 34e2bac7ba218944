use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::settings::{Provider, Settings};
use crate::error::{AssistantError, Result};

/// Embedding capability: texts in, one fixed-length vector per text out.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model(&self) -> &str;
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Completion capability: a rendered prompt in, generated text out.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str, temperature: f32, max_tokens: usize)
        -> Result<String>;
}

/// Both backend calls are network-bound; requests time out at the client
/// level and transient failures retry with a doubling delay.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;
pub const MAX_ATTEMPTS: usize = 3;
pub const RETRY_BASE_DELAY_MS: u64 = 500;

pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| AssistantError::Backend(format!("failed to build HTTP client: {}", e)))
}

pub(crate) async fn backoff(attempt: usize) {
    let delay = RETRY_BASE_DELAY_MS * (1 << attempt as u32);
    tokio::time::sleep(Duration::from_millis(delay)).await;
}

/// Selects the provider pair once at construction time.
pub fn build_backends(settings: &Settings) -> Result<(Arc<dyn Embedder>, Arc<dyn Completer>)> {
    match settings.llm.provider {
        Provider::Ollama => {
            let backend = Arc::new(crate::ai::ollama::OllamaBackend::new(
                settings.ollama_base_url(),
                settings.llm.embedding_model.clone(),
                settings.llm.llm_model.clone(),
            )?);
            Ok((backend.clone(), backend))
        }
        Provider::OpenAi => {
            let api_key = settings
                .llm
                .openai_api_key
                .clone()
                .ok_or_else(|| AssistantError::Config("openai_api_key is not set".into()))?;
            let backend = Arc::new(crate::ai::openai::OpenAiBackend::new(
                api_key,
                settings.llm.embedding_model.clone(),
                settings.llm.llm_model.clone(),
            )?);
            Ok((backend.clone(), backend))
        }
    }
}
