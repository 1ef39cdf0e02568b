//! Tally Core Library
//!
//! Shared functionality for the Tally expense tracker:
//! - Domain models (expenses, profiles, derived summaries)
//! - Input validation for expenses and profiles
//! - Spending aggregation (monthly, per category, daily)
//! - Error classification and retry with exponential backoff
//! - Database access and migrations
//! - Pluggable AI backends (Gemini, mock) and the insights flow
//! - Currency display helpers

pub mod aggregation;
pub mod ai;
pub mod classify;
pub mod currency;
pub mod db;
pub mod error;
pub mod insights;
pub mod models;
pub mod retry;
pub mod validation;

pub use ai::{AIBackend, AIClient, GeminiBackend, MockBackend};
pub use classify::{AppFailure, ErrorKind};
pub use db::Database;
pub use error::{Error, Result};
pub use insights::InsightsConfig;
pub use retry::{RetryPolicy, TransportError};
pub use validation::ValidationErrors;
