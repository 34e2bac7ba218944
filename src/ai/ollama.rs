use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ai::backend::{backoff, http_client, Completer, Embedder, MAX_ATTEMPTS};
use crate::error::{AssistantError, Result};
use crate::logger::Logger;

/// Local model server backend (Ollama API).
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    embedding_model: String,
    llm_model: String,
    logger: Logger,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaBackend {
    pub fn new(base_url: String, embedding_model: String, llm_model: String) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url,
            embedding_model,
            llm_model,
            logger: Logger::new("OllamaBackend"),
        })
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingRequest { model: &self.embedding_model, prompt: text };

        let mut last_error = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.post_embedding(&url, &request).await {
                Ok(vector) => return Ok(vector),
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

    async fn post_embedding(&self, url: &str, request: &EmbeddingRequest<'_>) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(url)
            .json(request)
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
        Ok(parsed.embedding)
    }

    async fn post_generate(&self, request: &GenerateRequest<'_>) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| AssistantError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Backend(format!(
                "generate request returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Backend(e.to_string()))?;
        Ok(parsed.response)
    }
}

#[async_trait]
impl Embedder for OllamaBackend {
    fn model(&self) -> &str {
        &self.embedding_model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // The Ollama embeddings endpoint takes one prompt per request.
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_one(text).await?);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl Completer for OllamaBackend {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<String> {
        let request = GenerateRequest {
            model: &self.llm_model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature, num_predict: max_tokens },
        };

        let mut last_error = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.post_generate(&request).await {
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
