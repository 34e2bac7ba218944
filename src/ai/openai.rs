use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ai::backend::{backoff, http_client, Completer, Embedder, MAX_ATTEMPTS};
use crate::error::{AssistantError, Result};
use crate::logger::Logger;

const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Hosted API backend (OpenAI-compatible endpoints).
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    embedding_model: String,
    llm_model: String,
    logger: Logger,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAiBackend {
    pub fn new(api_key: String, embedding_model: String, llm_model: String) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: OPENAI_BASE_URL.to_string(),
            api_key,
            embedding_model,
            llm_model,
            logger: Logger::new("OpenAiBackend"),
        })
    }

    async fn post_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let request = EmbeddingRequest { model: &self.embedding_model, input: texts };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Backend(format!(
                "embedding request returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Backend(e.to_string()))?;

        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        if data.len() != texts.len() {
            return Err(AssistantError::Backend(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                data.len()
            )));
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    async fn post_chat(&self, request: &ChatRequest<'_>) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| AssistantError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Backend(format!(
                "chat request returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Backend(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AssistantError::Backend("chat response had no choices".into()))
    }
}

#[async_trait]
impl Embedder for OpenAiBackend {
    fn model(&self) -> &str {
        &self.embedding_model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut last_error = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.post_embeddings(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) => {
                    self.logger.warn(&format!(
                        "Embedding attempt {}/{} failed: {}",
                        attempt + 1,
                        MAX_ATTEMPTS,
                        e
                    ));
                    last_error = Some(e);
                    if attempt + 1 < MAX_ATTEMPTS {
                        backoff(attempt).await;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| AssistantError::Backend("embedding failed".into())))
    }
}

#[async_trait]
impl Completer for OpenAiBackend {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.llm_model,
            messages: vec![ChatMessage { role: "user".to_string(), content: prompt.to_string() }],
            temperature,
            max_tokens,
        };

        let mut last_error = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.post_chat(&request).await {
                Ok(answer) => return Ok(answer),
                Err(e) => {
                    self.logger.warn(&format!(
                        "Completion attempt {}/{} failed: {}",
                        attempt + 1,
                        MAX_ATTEMPTS,
                        e
                    ));
                    last_error = Some(e);
                    if attempt + 1 < MAX_ATTEMPTS {
                        backoff(attempt).await;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| AssistantError::Backend("completion failed".into())))
    }
}
