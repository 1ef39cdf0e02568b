//! Pluggable AI backend abstraction
//!
//! # Architecture
//!
//! - `AIBackend` trait: the text generation interface used by the insights flow
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `GeminiBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (gemini, mock). Default: gemini
//! - `GEMINI_API_KEY`: API key (required for the gemini backend)
//! - `GEMINI_MODEL`: Model name (default: gemini-1.5-pro)
//! - `GEMINI_HOST`: API base URL (default: https://generativelanguage.googleapis.com)
//! - `TALLY_AI_TIMEOUT_SECS`, `TALLY_AI_MAX_RETRIES`, `TALLY_AI_RETRY_DELAY_MS`:
//!   per-attempt timeout and retry bounds, see [`crate::insights::InsightsConfig`]

mod gemini;
mod mock;

pub use gemini::GeminiBackend;
pub use mock::MockBackend;

use async_trait::async_trait;

use crate::error::Result;

/// Trait defining the interface for all AI backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Generate free text for a prompt
    async fn generate_text(&self, prompt: &str) -> Result<String>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
#[derive(Clone)]
pub enum AIClient {
    /// Google Gemini `generateContent` API
    Gemini(GeminiBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `gemini` (default): Uses GEMINI_API_KEY, GEMINI_MODEL and GEMINI_HOST
    /// - `mock`: Creates a mock backend for testing
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "gemini".to_string());

        match backend.to_lowercase().as_str() {
            "gemini" => GeminiBackend::from_env().map(AIClient::Gemini),
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to gemini");
                GeminiBackend::from_env().map(AIClient::Gemini)
            }
        }
    }

    /// Create a Gemini backend directly
    pub fn gemini(host: &str, model: &str, api_key: &str) -> Self {
        AIClient::Gemini(GeminiBackend::new(host, model, api_key))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }
}

#[async_trait]
impl AIBackend for AIClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        match self {
            AIClient::Gemini(b) => b.generate_text(prompt).await,
            AIClient::Mock(b) => b.generate_text(prompt).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Gemini(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Gemini(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
