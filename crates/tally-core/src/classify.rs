//! Error classification
//!
//! Maps heterogeneous failures (database errors, AI service errors, transport
//! errors) onto a closed set of error kinds. Each classified failure carries a
//! user-facing message, an HTTP-like status code and a retryable flag.
//!
//! Classification is table driven:
//! - database failures are matched on their error code first, then on message
//!   keywords
//! - AI service failures are matched on message keywords, in order
//! - [`is_retryable`] is the generic check used by the retry executor for any
//!   failure that implements [`FailureInfo`]

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::retry::TransportError;

/// Closed taxonomy of failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    NotFound,
    Database,
    Network,
    Timeout,
    AIService,
    Configuration,
    Internal,
}

impl ErrorKind {
    /// Label used in API error bodies
    pub fn label(&self) -> &'static str {
        match self {
            Self::Validation => "Validation Error",
            Self::Authentication => "Unauthorized",
            Self::Authorization => "Forbidden",
            Self::NotFound => "Not Found",
            Self::Database => "Database Error",
            Self::Network => "Network Error",
            Self::Timeout => "Timeout Error",
            Self::AIService => "AI Service Error",
            Self::Configuration => "Configuration Error",
            Self::Internal => "Internal Server Error",
        }
    }

    /// Status code used when a failure of this kind is built without one
    pub fn default_status(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Authentication => 401,
            Self::Authorization => 403,
            Self::NotFound => 404,
            Self::Database => 500,
            Self::Network => 503,
            Self::Timeout => 504,
            Self::AIService => 500,
            Self::Configuration => 503,
            Self::Internal => 500,
        }
    }

    /// Retryable flag used when a failure of this kind is built without one
    pub fn default_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::AIService)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A classified failure
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct AppFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub status_code: u16,
    pub retryable: bool,
}

impl AppFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>, status_code: u16, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code,
            retryable,
        }
    }

    /// Build a failure using the kind's default status and retryable flag
    pub fn of_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, kind.default_status(), kind.default_retryable())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::NotFound, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::Authorization, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::Authentication, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::Internal, message)
    }
}

// ============================================================================
// Database errors
// ============================================================================

/// Row not found (single-row query matched nothing)
pub const DB_NOT_FOUND: &str = "PGRST116";
/// Unique constraint violation
pub const DB_UNIQUE_VIOLATION: &str = "23505";
/// Foreign key violation
pub const DB_FOREIGN_KEY_VIOLATION: &str = "23503";
/// Not-null violation
pub const DB_NOT_NULL_VIOLATION: &str = "23502";
/// Session token expired
pub const DB_SESSION_EXPIRED: &str = "PGRST301";

/// A database failure reduced to its code and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbFailure {
    pub code: Option<String>,
    pub message: String,
}

impl DbFailure {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }
}

impl From<&rusqlite::Error> for DbFailure {
    fn from(err: &rusqlite::Error) -> Self {
        use rusqlite::ffi;

        let code = match err {
            rusqlite::Error::QueryReturnedNoRows => Some(DB_NOT_FOUND),
            rusqlite::Error::SqliteFailure(e, _) => match e.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Some(DB_UNIQUE_VIOLATION)
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(DB_FOREIGN_KEY_VIOLATION),
                ffi::SQLITE_CONSTRAINT_NOTNULL => Some(DB_NOT_NULL_VIOLATION),
                _ => None,
            },
            _ => None,
        };

        Self::new(code, err.to_string())
    }
}

/// Classify a database failure
pub fn classify_database_error(failure: &DbFailure) -> AppFailure {
    match failure.code.as_deref() {
        Some(DB_NOT_FOUND) => AppFailure::new(ErrorKind::NotFound, "Resource not found", 404, false),
        Some(DB_UNIQUE_VIOLATION) => AppFailure::new(
            ErrorKind::Validation,
            "A record with this value already exists",
            400,
            false,
        ),
        Some(DB_FOREIGN_KEY_VIOLATION) => AppFailure::new(
            ErrorKind::Validation,
            "Referenced record does not exist",
            400,
            false,
        ),
        Some(DB_NOT_NULL_VIOLATION) => {
            AppFailure::new(ErrorKind::Validation, "Required field is missing", 400, false)
        }
        Some(DB_SESSION_EXPIRED) => AppFailure::new(
            ErrorKind::Authentication,
            "Session expired. Please log in again.",
            401,
            false,
        ),
        _ => {
            let message = if failure.message.is_empty() {
                "Database operation failed"
            } else {
                failure.message.as_str()
            };

            if message.contains("connection") || message.contains("timeout") {
                AppFailure::new(
                    ErrorKind::Database,
                    "Database connection error. Please try again.",
                    503,
                    true,
                )
            } else {
                AppFailure::new(ErrorKind::Database, message, 500, false)
            }
        }
    }
}

// ============================================================================
// AI service errors
// ============================================================================

/// Classify an AI service failure by its message
pub fn classify_ai_error(message: &str) -> AppFailure {
    let message = if message.is_empty() {
        "AI service error"
    } else {
        message
    };

    if message.contains("API key") {
        AppFailure::new(
            ErrorKind::Configuration,
            "AI service is not properly configured",
            503,
            false,
        )
    } else if message.contains("timeout") {
        AppFailure::new(
            ErrorKind::Timeout,
            "AI service took too long to respond. Please try again.",
            504,
            true,
        )
    } else if message.contains("rate limit") || message.contains("quota") {
        AppFailure::new(
            ErrorKind::AIService,
            "AI service rate limit reached. Please try again later.",
            429,
            true,
        )
    } else if message.contains("network") || message.contains("fetch") {
        AppFailure::new(
            ErrorKind::Network,
            "Network error connecting to AI service",
            503,
            true,
        )
    } else {
        AppFailure::new(
            ErrorKind::AIService,
            "Failed to generate insights. Please try again later.",
            500,
            true,
        )
    }
}

// ============================================================================
// Generic retryability
// ============================================================================

/// What the generic retryability check needs to know about a failure
pub trait FailureInfo {
    /// Human-readable failure message
    fn message(&self) -> Cow<'_, str>;

    /// HTTP-like status code, if the failure carries one
    fn status_code(&self) -> Option<u16> {
        None
    }

    /// Explicit retryable flag of an already-classified failure
    fn retryable_hint(&self) -> Option<bool> {
        None
    }
}

const NETWORK_KEYWORDS: [&str; 4] = ["network", "fetch", "connection", "timeout"];

/// Whether a message describes a network-level failure
pub fn is_network_message(message: &str) -> bool {
    let message = message.to_lowercase();
    NETWORK_KEYWORDS.iter().any(|k| message.contains(k))
}

/// Server errors, request timeouts and rate limits are worth retrying
pub fn is_retryable_status(status: u16) -> bool {
    status >= 500 || matches!(status, 408 | 429 | 504)
}

/// Generic retryability check used by the retry executor
pub fn is_retryable<E: FailureInfo + ?Sized>(err: &E) -> bool {
    if let Some(flag) = err.retryable_hint() {
        return flag;
    }

    if is_network_message(&err.message()) {
        return true;
    }

    err.status_code().map(is_retryable_status).unwrap_or(false)
}

impl FailureInfo for AppFailure {
    fn message(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.message)
    }

    fn status_code(&self) -> Option<u16> {
        Some(self.status_code)
    }

    fn retryable_hint(&self) -> Option<bool> {
        Some(self.retryable)
    }
}

impl FailureInfo for Error {
    fn message(&self) -> Cow<'_, str> {
        match self {
            Error::Classified(f) => Cow::Borrowed(&f.message),
            other => Cow::Owned(other.to_string()),
        }
    }

    fn status_code(&self) -> Option<u16> {
        match self {
            Error::Classified(f) => Some(f.status_code),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            Error::Transport(t) => t.status_code(),
            _ => None,
        }
    }

    fn retryable_hint(&self) -> Option<bool> {
        match self {
            Error::Classified(f) => Some(f.retryable),
            Error::Transport(t) => t.retryable_hint(),
            _ => None,
        }
    }
}

impl Error {
    /// Assign an error kind to this error
    ///
    /// Already-classified errors are returned unchanged.
    pub fn classify(&self) -> AppFailure {
        match self {
            Error::Classified(f) => f.clone(),
            Error::Database(e) => classify_database_error(&DbFailure::from(e)),
            Error::Pool(e) => classify_database_error(&DbFailure::new(None, e.to_string())),
            Error::Http(e) if e.is_timeout() => AppFailure::of_kind(
                ErrorKind::Timeout,
                "The upstream service took too long to respond. Please try again.",
            ),
            Error::Http(_) => AppFailure::of_kind(
                ErrorKind::Network,
                "Network error connecting to upstream service",
            ),
            Error::Transport(TransportError::Timeout(_)) => AppFailure::of_kind(
                ErrorKind::Timeout,
                "The upstream service took too long to respond. Please try again.",
            ),
            Error::Transport(TransportError::Network(_)) => AppFailure::of_kind(
                ErrorKind::Network,
                "Network error connecting to upstream service",
            ),
            Error::Transport(TransportError::ServerStatus { .. }) => AppFailure::new(
                ErrorKind::Network,
                "Upstream service is unavailable. Please try again.",
                503,
                true,
            ),
            Error::Transport(TransportError::ClientStatus { .. }) => {
                AppFailure::internal("Upstream service rejected the request")
            }
            Error::Transport(TransportError::InvalidBody(_)) => {
                AppFailure::internal("Upstream service returned an invalid response")
            }
            Error::InvalidData(msg) => AppFailure::validation(msg.clone()),
            Error::NotFound(msg) => AppFailure::not_found(msg.clone()),
            Error::Config(msg) => AppFailure::of_kind(ErrorKind::Configuration, msg.clone()),
            Error::Io(_) | Error::Json(_) => {
                AppFailure::internal("An unexpected error occurred")
            }
        }
    }
}
