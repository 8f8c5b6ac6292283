//! NL service integration.
//!
//! The conversational pipeline treats the NL service as a black box that
//! turns a prompt plus user text into either free text or a JSON object.
//! All call sites degrade gracefully on failure — a provider error never
//! aborts a session.

pub mod gemini;
pub mod provider;
pub(crate) mod retry;

pub use gemini::GeminiProvider;
pub use provider::{CompletionRequest, CompletionResponse, LlmProvider};
pub use retry::with_retry;

use std::sync::Arc;

use secrecy::SecretString;

/// Supported NL backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
}

/// Configuration for creating an NL provider.
#[derive(Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: SecretString,
    pub model: String,
}

/// Create an NL provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    match config.backend {
        LlmBackend::Gemini => {
            tracing::info!(model = %config.model, "Using Gemini");
            Arc::new(GeminiProvider::new(config.api_key.clone(), config.model.clone()))
        }
    }
}
