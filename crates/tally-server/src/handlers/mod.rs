//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod auth;
pub mod expenses;
pub mod health;
pub mod insights;
pub mod profile;
pub mod summary;

// Re-export all handlers for use in router
pub use auth::*;
pub use expenses::*;
pub use health::*;
pub use insights::*;
pub use profile::*;
pub use summary::*;

use serde::Serialize;

/// Standard success envelope: `{data, message?}`
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: &'static str) -> Self {
        Self {
            data,
            message: Some(message),
        }
    }
}

/// Parse an optional `YYYY-MM-DD` query parameter
pub(crate) fn parse_date_param(
    name: &str,
    value: Option<&str>,
) -> Result<Option<chrono::NaiveDate>, crate::AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => chrono::NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                crate::AppError::bad_request(&format!("{} must be a date in YYYY-MM-DD format", name))
            }),
    }
}
