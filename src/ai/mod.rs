pub mod backend;
pub mod ollama;
pub mod openai;

pub use backend::{build_backends, Completer, Embedder};
