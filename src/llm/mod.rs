//! LLM integration for the fitness coach.
//!
//! A single backend is supported: the Hugging Face inference router, called
//! through its OpenAI-compatible chat-completions endpoint. Everything else
//! in the crate talks to the `LlmProvider` trait so tests can swap in a stub.

pub mod huggingface;
pub mod provider;
pub mod routes;

pub use huggingface::HuggingFaceProvider;
pub use provider::*;
pub use routes::{GenerateState, generate_routes};

use std::sync::Arc;

use crate::config::LlmSettings;
use crate::error::LlmError;

/// Create the completion provider from configuration.
pub fn create_provider(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = HuggingFaceProvider::new(settings)?;
    tracing::info!(
        endpoint = provider.endpoint(),
        "Using Hugging Face router (model: {})",
        settings.model
    );
    Ok(Arc::new(provider))
}
