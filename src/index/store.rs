use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AssistantError, Result};
use crate::vault::Chunk;

pub const INDEX_FILE: &str = "index.json";
pub const METADATA_FILE: &str = "metadata.json";

/// One indexed chunk with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// The persisted structure artifact: every entry plus the embedding model
/// that produced the vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    pub embedding_model: String,
    pub entries: Vec<IndexEntry>,
}

/// Small metadata record persisted next to the structure artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub num_documents: usize,
    pub embedding_model: String,
    pub created_at: DateTime<Utc>,
}

/// A retrieved chunk with its distance to the query. Lower is closer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    pub score: f32,
}

impl VectorIndex {
    pub fn new(embedding_model: String) -> Self {
        Self { embedding_model, entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, chunk: Chunk, vector: Vec<f32>) {
        self.entries.push(IndexEntry { chunk, vector });
    }

    /// Brute-force scan: squared L2 distance to every entry, ascending,
    /// truncated to `k`.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<RetrievalResult> {
        let mut results: Vec<RetrievalResult> = self
            .entries
            .iter()
            .map(|entry| RetrievalResult {
                chunk: entry.chunk.clone(),
                score: squared_l2(query, &entry.vector),
            })
            .collect();
        results.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        results
    }

    fn index_path(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE)
    }

    fn metadata_path(dir: &Path) -> PathBuf {
        dir.join(METADATA_FILE)
    }

    /// Writes both artifacts. The structure blob goes through a temp file
    /// and rename, and the metadata record is written last, so a
    /// half-written save leaves no metadata behind.
    pub fn save_to(&self, dir: &Path) -> Result<IndexMetadata> {
        std::fs::create_dir_all(dir)?;

        let structure = serde_json::to_vec(self)
            .map_err(|e| AssistantError::IndexLoad(format!("failed to serialize index: {}", e)))?;
        let tmp_path = dir.join(format!("{}.tmp", INDEX_FILE));
        std::fs::write(&tmp_path, structure)?;
        std::fs::rename(&tmp_path, Self::index_path(dir))?;

        let metadata = IndexMetadata {
            num_documents: self.len(),
            embedding_model: self.embedding_model.clone(),
            created_at: Utc::now(),
        };
        let record = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| AssistantError::IndexLoad(format!("failed to serialize metadata: {}", e)))?;
        std::fs::write(Self::metadata_path(dir), record)?;

        Ok(metadata)
    }

    /// Loads both artifacts. `Ok(None)` when the structure artifact does not
    /// exist (the expected first-run condition); corruption or a missing
    /// metadata record fails loudly.
    pub fn load_from(dir: &Path) -> Result<Option<(Self, IndexMetadata)>> {
        let index_path = Self::index_path(dir);
        if !index_path.exists() {
            return Ok(None);
        }

        let structure = std::fs::read(&index_path)?;
        let index: VectorIndex = serde_json::from_slice(&structure)
            .map_err(|e| AssistantError::IndexLoad(format!("corrupt index artifact: {}", e)))?;

        let metadata_path = Self::metadata_path(dir);
        if !metadata_path.exists() {
            return Err(AssistantError::IndexLoad(
                "index artifact present but metadata record missing".into(),
            ));
        }
        let record = std::fs::read(&metadata_path)?;
        let metadata: IndexMetadata = serde_json::from_slice(&record)
            .map_err(|e| AssistantError::IndexLoad(format!("corrupt metadata record: {}", e)))?;

        if metadata.num_documents != index.len() {
            return Err(AssistantError::IndexLoad(format!(
                "metadata reports {} documents but index holds {}",
                metadata.num_documents,
                index.len()
            )));
        }

        Ok(Some((index, metadata)))
    }

    /// Removes both artifacts; succeeds when they are already gone.
    pub fn remove_artifacts(dir: &Path) -> Result<()> {
        for path in [Self::index_path(dir), Self::metadata_path(dir)] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
