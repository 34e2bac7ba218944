pub mod ai;
pub mod assistant;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod logger;
pub mod vault;

pub use assistant::KnowledgeAssistant;
pub use config::Settings;
pub use error::{AssistantError, Result};
