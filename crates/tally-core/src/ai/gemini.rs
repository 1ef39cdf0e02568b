//! Google Gemini backend implementation
//!
//! Calls the `generateContent` REST endpoint through [`fetch_json_with_retry`].
//! Each attempt, body included, has its own deadline. A 4xx answer is
//! returned on first occurrence while 5xx, timeouts and connection failures
//! are retried with backoff.
//!
//! # Configuration
//!
//! Environment variables:
//! - `GEMINI_API_KEY`: API key (required)
//! - `GEMINI_MODEL`: Model name (default: gemini-1.5-pro)
//! - `GEMINI_HOST`: API base URL (default: https://generativelanguage.googleapis.com)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::insights::InsightsConfig;
use crate::retry::{fetch_json_with_retry, RetryPolicy, TransportError};

use super::AIBackend;

pub const DEFAULT_GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";

/// Gemini backend
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts concatenated
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

impl GeminiBackend {
    /// Create a new Gemini backend with the default timeout and retry bounds
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        Self::with_config(base_url, model, api_key, &InsightsConfig::default())
    }

    /// Create a backend using the timeout and retry bounds from `config`
    pub fn with_config(base_url: &str, model: &str, api_key: &str, config: &InsightsConfig) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            timeout: config.timeout,
            retry: config.retry,
        }
    }

    /// Create from environment variables
    ///
    /// Required: `GEMINI_API_KEY`
    /// Optional: `GEMINI_MODEL`, `GEMINI_HOST`
    pub fn from_env() -> Option<Self> {
        let api_key = match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                warn!("GEMINI_API_KEY is not set. AI insights will not be available.");
                return None;
            }
        };
        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
        let host = std::env::var("GEMINI_HOST").unwrap_or_else(|_| DEFAULT_GEMINI_HOST.to_string());

        Some(Self::with_config(
            &host,
            &model,
            &api_key,
            &InsightsConfig::from_env(),
        ))
    }

    fn model_url(&self) -> String {
        format!("{}/v1beta/models/{}", self.base_url, self.model)
    }
}

#[async_trait]
impl AIBackend for GeminiBackend {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let url = format!("{}:generateContent", self.model_url());
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Calling Gemini generateContent");

        let parsed: GenerateResponse = fetch_json_with_retry(&self.retry, self.timeout, || {
            self.http_client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await
        .map_err(|e| match e {
            TransportError::InvalidBody(msg) => {
                Error::InvalidData(format!("Invalid response from Gemini API: {}", msg))
            }
            other => Error::Transport(other),
        })?;

        Ok(parsed.into_text())
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(self.model_url())
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Gemini health check failed");
                false
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
