use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy for the assistant.
///
/// Per-file decode problems during vault loading are not represented here;
/// they are logged and the file is skipped. Everything else propagates to
/// the caller as one of these variants.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Obsidian vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("File is not valid UTF-8: {0}")]
    Decode(String),

    #[error("No documents provided for indexing")]
    EmptyInput,

    #[error("Vector store not initialized. Call initialize() first")]
    UninitializedIndex,

    #[error("Failed to load vector store: {0}")]
    IndexLoad(String),

    #[error("Backend request failed: {0}")]
    Backend(String),

    #[error("Prompt template must contain {{context}} and {{question}} placeholders")]
    InvalidTemplate,

    #[error("Knowledge assistant not initialized. Call initialize() first")]
    NotInitialized,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AssistantError>;
