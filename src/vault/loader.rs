use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{AssistantError, Result};
use crate::logger::Logger;
use crate::vault::chunker::TextChunker;
use crate::vault::parser::MarkdownParser;
use crate::vault::{Chunk, DocMetadata, VaultStats};

/// Walks the vault, parses each markdown file and cuts it into chunks
/// carrying the file's metadata.
pub struct VaultLoader {
    vault_path: PathBuf,
    parser: MarkdownParser,
    chunker: TextChunker,
    ignore_patterns: HashSet<String>,
    logger: Logger,
}

impl VaultLoader {
    pub fn new(vault_path: PathBuf, chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let parser = MarkdownParser::new()
            .map_err(|e| AssistantError::Config(format!("failed to build parser: {}", e)))?;

        let mut ignore_patterns = HashSet::new();
        ignore_patterns.insert(".git".to_string());
        ignore_patterns.insert(".obsidian".to_string());
        ignore_patterns.insert(".trash".to_string());
        ignore_patterns.insert("node_modules".to_string());

        Ok(Self {
            vault_path,
            parser,
            chunker: TextChunker::new(chunk_size, chunk_overlap),
            ignore_patterns,
            logger: Logger::new("VaultLoader"),
        })
    }

    /// Loads every markdown file under the vault root into chunks.
    ///
    /// Files that cannot be read or decoded are skipped with a warning; one
    /// bad file never aborts the load.
    pub async fn load_documents(&self) -> Result<Vec<Chunk>> {
        if !self.vault_path.exists() {
            return Err(AssistantError::VaultNotFound(self.vault_path.clone()));
        }

        let files = self.scan_markdown_files();
        self.logger
            .info(&format!("Found {} markdown files in vault", files.len()));

        let mut chunks = Vec::new();
        let mut skipped = 0usize;
        for path in &files {
            match self.load_single_file(path).await {
                Ok(file_chunks) => chunks.extend(file_chunks),
                Err(e) => {
                    skipped += 1;
                    self.logger
                        .warn(&format!("Skipping {}: {}", path.display(), e));
                }
            }
        }

        if skipped > 0 {
            self.logger
                .warn(&format!("Skipped {} unreadable files", skipped));
        }
        self.logger
            .info(&format!("Loaded {} chunks from {} files", chunks.len(), files.len() - skipped));
        Ok(chunks)
    }

    async fn load_single_file(&self, path: &Path) -> Result<Vec<Chunk>> {
        let bytes = tokio::fs::read(path).await?;
        let content = String::from_utf8(bytes)
            .map_err(|e| AssistantError::Decode(e.utf8_error().to_string()))?;

        let (extra, body) = self.parser.split_front_matter(&content);

        let source = path
            .strip_prefix(&self.vault_path)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();
        let file_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let metadata = DocMetadata {
            source,
            file_name,
            file_path: path.to_path_buf(),
            links: self.parser.extract_links(&body),
            tags: self.parser.extract_tags(&body),
            extra,
        };

        let cleaned = self.parser.clean(&body);
        let chunks = self
            .chunker
            .split(&cleaned)
            .into_iter()
            .map(|text| Chunk { text, metadata: metadata.clone() })
            .collect();
        Ok(chunks)
    }

    /// Recomputed on every call; nothing is cached.
    pub fn get_vault_stats(&self) -> Result<VaultStats> {
        if !self.vault_path.exists() {
            return Err(AssistantError::VaultNotFound(self.vault_path.clone()));
        }

        let files = self.scan_markdown_files();
        let total_size_bytes = files
            .iter()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .sum();

        Ok(VaultStats {
            total_files: files.len(),
            total_size_bytes,
            vault_path: self.vault_path.to_string_lossy().to_string(),
        })
    }

    /// All `.md` files, sorted lexicographically by path so chunk order is
    /// stable across runs.
    fn scan_markdown_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.vault_path)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| !self.should_ignore(p))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
            .collect();
        files.sort();
        files
    }

    fn should_ignore(&self, path: &Path) -> bool {
        path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .map(|name| self.ignore_patterns.contains(name))
                .unwrap_or(false)
        })
    }
}
