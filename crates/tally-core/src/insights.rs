//! AI spending insights
//!
//! Builds the analysis prompt from a list of expenses, sends it to an
//! [`AIBackend`] and turns every failure into a classified [`AppFailure`]
//! using the AI service rules.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tracing::{error, info};

use crate::ai::AIBackend;
use crate::classify::{classify_ai_error, AppFailure};
use crate::error::{Error, Result};
use crate::models::{Category, Expense, SpendingInsights};
use crate::retry::{RetryPolicy, TransportError};

/// Message used when an attempt exceeds its time budget
pub const TIMEOUT_MESSAGE: &str = "Request timeout - AI service took too long to respond";

/// Message used when no backend is configured
pub const MISSING_KEY_MESSAGE: &str = "Gemini API key is not configured";

/// Timeout and retry bounds for AI calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsightsConfig {
    /// Budget for a single attempt
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::transport(),
        }
    }
}

impl InsightsConfig {
    /// Read overrides from `TALLY_AI_TIMEOUT_SECS`, `TALLY_AI_MAX_RETRIES`
    /// and `TALLY_AI_RETRY_DELAY_MS`; unset or unparsable values keep the
    /// defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let timeout = env_u64("TALLY_AI_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let max_retries = env_u64("TALLY_AI_MAX_RETRIES")
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(defaults.retry.max_retries);
        let initial_delay = env_u64("TALLY_AI_RETRY_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.initial_delay);

        Self {
            timeout,
            retry: RetryPolicy::new(max_retries, initial_delay),
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(var = name, value = %value, "Ignoring invalid numeric setting");
            None
        }
    }
}

/// Summarize expenses for the prompt
///
/// Total, transaction count, date range and per-category totals sorted by
/// amount, largest first.
pub fn format_expenses_for_prompt(expenses: &[Expense]) -> String {
    let total: f64 = expenses.iter().map(|e| e.amount).sum();

    let mut by_category: Vec<(Category, f64)> = Vec::new();
    for expense in expenses {
        match by_category.iter_mut().find(|(c, _)| *c == expense.category) {
            Some((_, sum)) => *sum += expense.amount,
            None => by_category.push((expense.category, expense.amount)),
        }
    }
    by_category.sort_by(|a, b| b.1.total_cmp(&a.1));

    let categories = by_category
        .iter()
        .map(|(category, amount)| format!("  - {}: ${:.2}", category, amount))
        .collect::<Vec<_>>()
        .join("\n");

    let first = expenses.iter().map(|e| e.date).min();
    let last = expenses.iter().map(|e| e.date).max();

    format!(
        "Total Expenses: ${:.2}\n\
         Number of Transactions: {}\n\
         Date Range: {} to {}\n\
         \n\
         Spending by Category:\n\
         {}",
        total,
        expenses.len(),
        display_date(first),
        display_date(last),
        categories
    )
    .trim()
    .to_string()
}

fn display_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%-m/%-d/%Y").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// Full prompt sent to the AI backend
pub fn build_prompt(expenses: &[Expense]) -> String {
    format!(
        "You are a personal finance assistant analyzing spending habits. Based on the following expense data, provide:\n\
         \n\
         1. A brief summary of spending habits (2-3 sentences)\n\
         2. Two specific, actionable saving recommendations\n\
         3. One motivational message to encourage better financial habits\n\
         \n\
         Expense Data:\n\
         {}\n\
         \n\
         Please format your response in a clear, friendly, and encouraging tone. Keep it concise and actionable.",
        format_expenses_for_prompt(expenses)
    )
}

/// Classified failure for a request made while no AI backend is configured
pub fn missing_backend_failure() -> AppFailure {
    classify_ai_error(MISSING_KEY_MESSAGE)
}

/// Classify a backend error with the AI service rules
///
/// Already-classified failures are passed through unchanged.
pub fn classify_backend_error(err: &Error) -> AppFailure {
    let message = match err {
        Error::Classified(failure) => return failure.clone(),
        Error::Transport(TransportError::Timeout(_)) => TIMEOUT_MESSAGE.to_string(),
        Error::Http(e) if e.is_timeout() => TIMEOUT_MESSAGE.to_string(),
        Error::Transport(TransportError::Network(e)) => format!("network error: {}", e),
        Error::Http(e) => format!("network error: {}", e),
        Error::InvalidData(message) | Error::Config(message) => message.clone(),
        other => other.to_string(),
    };
    classify_ai_error(&message)
}

/// Generate spending insights for a non-empty list of expenses
///
/// Every failure is returned as `Error::Classified`.
pub async fn generate_spending_insights<B>(backend: &B, expenses: &[Expense]) -> Result<SpendingInsights>
where
    B: AIBackend + ?Sized,
{
    if expenses.is_empty() {
        return Err(classify_ai_error("No expense data provided for analysis").into());
    }

    let prompt = build_prompt(expenses);
    info!(
        expenses = expenses.len(),
        model = backend.model(),
        "Generating spending insights"
    );

    let text = match backend.generate_text(&prompt).await {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "Error generating spending insights");
            return Err(classify_backend_error(&e).into());
        }
    };

    if text.trim().is_empty() {
        error!("Empty response from AI backend");
        return Err(classify_ai_error("Empty response from Gemini API").into());
    }

    Ok(SpendingInsights {
        insights: text,
        generated_at: Utc::now(),
    })
}
