pub mod chunker;
pub mod loader;
pub mod parser;

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Document-level metadata inherited by every chunk cut from a file.
///
/// `source` is the path relative to the vault root and uniquely identifies
/// the file. `extra` carries whatever key/value pairs the front-matter
/// declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMetadata {
    pub source: String,
    pub file_name: String,
    pub file_path: PathBuf,
    pub links: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// The unit of embedding and retrieval: a bounded text segment plus the
/// metadata of the file it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: DocMetadata,
}

/// Snapshot of the vault on disk, recomputed on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultStats {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub vault_path: String,
}

pub use loader::VaultLoader;
