//! Mock backend for testing
//!
//! Returns a canned insight text, or a scripted failure, without any network
//! access. Calls are counted so tests can assert how often the backend was hit.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::AIBackend;

/// Mock AI backend for testing
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    response: Option<String>,
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            ..Default::default()
        }
    }

    /// Always answer with `text`
    pub fn with_response(text: &str) -> Self {
        Self {
            response: Some(text.to_string()),
            ..Self::new()
        }
    }

    /// Always fail with `message`
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// Number of generate calls made so far (shared between clones)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            return Err(Error::InvalidData(message.clone()));
        }

        if let Some(text) = &self.response {
            return Ok(text.clone());
        }

        let total_line = prompt
            .lines()
            .find(|l| l.starts_with("Total Expenses:"))
            .unwrap_or("Total Expenses: unknown");

        Ok(format!(
            "Summary: {}. Your spending is concentrated in a few categories.\n\
             Tip 1: Set a weekly budget for your largest category.\n\
             Tip 2: Review recurring charges once a month.\n\
             Keep going, small changes add up!",
            total_line
        ))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
