//! Retry with exponential backoff
//!
//! [`retry_with_backoff`] runs a failable async operation sequentially:
//!
//! - Attempting: the operation is awaited
//! - Succeeded: the value is returned
//! - FailedTerminal: the failure is not retryable, or retries are exhausted;
//!   the last failure is returned
//! - WaitingToRetry: sleep `initial_delay * 2^attempt`, then attempt again
//!
//! Retryability is decided by [`is_retryable`]. There is no jitter and no
//! cancellation; attempts never overlap.
//!
//! [`fetch_json_with_retry`] applies the same loop to HTTP requests, with one
//! override: a 4xx response is a permanent request defect and is never
//! retried. Each attempt (request, status check and body) runs under its own
//! deadline; expiry is a [`TransportError::Timeout`].

use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classify::{is_retryable, FailureInfo};

/// Retry bounds for one call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each later retry
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    /// Policy used for HTTP transport calls
    pub fn transport() -> Self {
        Self::new(2, Duration::from_millis(1000))
    }

    /// Delay to wait after the failed attempt with the given zero-based index
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Run `operation`, retrying retryable failures with exponential backoff
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: FailureInfo + std::fmt::Display,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if !is_retryable(&err) {
                    debug!(error = %err, "Failure is not retryable");
                    return Err(err);
                }

                if attempt >= policy.max_retries {
                    warn!(attempts = attempt + 1, error = %err, "Retries exhausted");
                    return Err(err);
                }

                let delay = policy.delay_for(attempt);
                info!(
                    error = %err,
                    "Retry attempt {}/{} after {}ms",
                    attempt + 1,
                    policy.max_retries,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Failure of a single HTTP exchange
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Client error {status}: {body}")]
    ClientStatus { status: u16, body: String },

    #[error("Server error {status}: {body}")]
    ServerStatus { status: u16, body: String },

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Invalid response body: {0}")]
    InvalidBody(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::InvalidBody(err.to_string())
        } else {
            Self::Network(err)
        }
    }
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ClientStatus { status, .. } | Self::ServerStatus { status, .. } => Some(*status),
            Self::Timeout(_) | Self::Network(_) | Self::InvalidBody(_) => None,
        }
    }
}

impl FailureInfo for TransportError {
    fn message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn status_code(&self) -> Option<u16> {
        self.status()
    }

    fn retryable_hint(&self) -> Option<bool> {
        match self {
            Self::ClientStatus { .. } | Self::InvalidBody(_) => Some(false),
            _ => None,
        }
    }
}

/// Run one attempt under `limit`, turning expiry into a timeout failure
pub async fn with_deadline<T, Fut>(limit: Duration, attempt: Fut) -> Result<T, TransportError>
where
    Fut: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(limit, attempt).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(format!(
            "no complete response within {}ms",
            limit.as_millis()
        ))),
    }
}

/// Turn non-success statuses into errors so they go through the retry decision
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();

    if status.is_client_error() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::ClientStatus {
            status: status.as_u16(),
            body,
        });
    }

    if status.is_server_error() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::ServerStatus {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

/// Send an HTTP request and decode its JSON body, with retry
///
/// `build` is called once per attempt since a request cannot be sent twice.
/// The body is read inside the attempt, so a response that stalls after its
/// headers times out and is retried like any other slow attempt.
pub async fn fetch_json_with_retry<T, F>(
    policy: &RetryPolicy,
    timeout: Duration,
    build: F,
) -> Result<T, TransportError>
where
    T: DeserializeOwned,
    F: Fn() -> reqwest::RequestBuilder,
{
    retry_with_backoff(policy, || {
        let request = build();
        with_deadline(timeout, async move {
            let response = request.send().await.map_err(TransportError::from)?;
            let response = check_status(response).await?;
            response.json::<T>().await.map_err(TransportError::from)
        })
    })
    .await
}
