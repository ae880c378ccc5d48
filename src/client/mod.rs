// src/client/mod.rs

pub mod ollama;
pub use ollama::OllamaClient;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Connection(String),

    #[error("model request timed out")]
    Timeout,

    #[error("model returned HTTP {0}")]
    Status(u16),

    #[error("model response is unusable: {0}")]
    InvalidResponse(String),
}

/// Text-completion backend used by the model-backed generator.
///
/// Implementations own transport, retries and model discovery; the planner
/// makes exactly one call per planning attempt and never retries.
pub trait ModelClient: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, ModelError>;
}
