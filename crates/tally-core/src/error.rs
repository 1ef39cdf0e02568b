//! Error types for Tally

use thiserror::Error;

use crate::classify::AppFailure;
use crate::retry::TransportError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A failure that has already been assigned an error kind.
    #[error("{0}")]
    Classified(#[from] AppFailure),
}

pub type Result<T> = std::result::Result<T, Error>;
