use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::ai::Completer;
use crate::error::{AssistantError, Result};
use crate::index::{RetrievalResult, VectorStoreManager};
use crate::logger::Logger;
use crate::vault::Chunk;

const DEFAULT_PROMPT_TEMPLATE: &str = "Answer the question using the context below. \
Be direct and conversational - just explain it naturally without mentioning documents or sources.

Context:
{context}

Question: {question}

Answer directly and naturally:";

const PREVIEW_CHARS: usize = 200;

/// A cited source file for an answer. `score` and `preview` are only
/// populated when the caller asked for scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCitation {
    pub source: String,
    pub file_name: String,
    pub tags: Vec<String>,
    pub links: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// Token/cost counters. The backends report no usage, so this is always
/// zero-filled; callers must not bill or meter from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub total_tokens: usize,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceCitation>,
    pub source_chunks: Vec<Chunk>,
    pub usage: Usage,
}

/// Retrieves context for a question, renders the instruction template and
/// asks the completion backend for an answer.
pub struct RagEngine {
    store: Arc<VectorStoreManager>,
    completer: Arc<dyn Completer>,
    top_k: usize,
    temperature: f32,
    max_tokens: usize,
    prompt_template: RwLock<String>,
    logger: Logger,
}

impl RagEngine {
    pub fn new(
        store: Arc<VectorStoreManager>,
        completer: Arc<dyn Completer>,
        top_k: usize,
        temperature: f32,
        max_tokens: usize,
    ) -> Self {
        Self {
            store,
            completer,
            top_k,
            temperature,
            max_tokens,
            prompt_template: RwLock::new(DEFAULT_PROMPT_TEMPLATE.to_string()),
            logger: Logger::new("RagEngine"),
        }
    }

    pub async fn ask(&self, question: &str, include_scores: bool) -> Result<QueryResponse> {
        let results = self
            .store
            .similarity_search(question, self.top_k, None)
            .await?;
        self.logger
            .debug(&format!("Retrieved {} chunks for question", results.len()));

        let context = format_context(&results);
        let prompt = {
            let template = self.prompt_template.read().await;
            template
                .replace("{context}", &context)
                .replace("{question}", question)
        };

        let answer = self
            .completer
            .complete(&prompt, self.temperature, self.max_tokens)
            .await?;

        let sources = if include_scores {
            format_sources_with_scores(&results)
        } else {
            format_sources_deduped(&results)
        };

        Ok(QueryResponse {
            answer,
            sources,
            source_chunks: results.into_iter().map(|r| r.chunk).collect(),
            usage: Usage::default(),
        })
    }

    /// Replaces the instruction template for subsequent calls. The template
    /// must keep both placeholders.
    pub async fn update_prompt(&self, template: &str) -> Result<()> {
        if !template.contains("{context}") || !template.contains("{question}") {
            return Err(AssistantError::InvalidTemplate);
        }
        let mut current = self.prompt_template.write().await;
        *current = template.to_string();
        Ok(())
    }
}

/// Retrieved texts in rank order, blank-line separated, no source labels —
/// the model sees clean prose and answers without inline citations.
fn format_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .map(|r| r.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One citation per retrieved chunk, in rank order, with score and preview.
fn format_sources_with_scores(results: &[RetrievalResult]) -> Vec<SourceCitation> {
    results
        .iter()
        .map(|r| SourceCitation {
            source: r.chunk.metadata.source.clone(),
            file_name: r.chunk.metadata.file_name.clone(),
            tags: r.chunk.metadata.tags.iter().cloned().collect(),
            links: r.chunk.metadata.links.iter().cloned().collect(),
            score: Some(r.score),
            preview: Some(preview(&r.chunk.text)),
        })
        .collect()
}

/// Citations deduplicated by source; the first (best-ranked) chunk wins.
fn format_sources_deduped(results: &[RetrievalResult]) -> Vec<SourceCitation> {
    let mut seen = HashSet::new();
    results
        .iter()
        .filter(|r| seen.insert(r.chunk.metadata.source.clone()))
        .map(|r| SourceCitation {
            source: r.chunk.metadata.source.clone(),
            file_name: r.chunk.metadata.file_name.clone(),
            tags: r.chunk.metadata.tags.iter().cloned().collect(),
            links: r.chunk.metadata.links.iter().cloned().collect(),
            score: None,
            preview: None,
        })
        .collect()
}

fn preview(text: &str) -> String {
    let truncated: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        format!("{}...", truncated)
    } else {
        truncated
    }
}
