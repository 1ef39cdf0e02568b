//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - date argument parsing and currency lookup used by the other commands

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tally_core::db::Database;
use tally_core::models::DEFAULT_CURRENCY;
use tracing::debug;

/// Open (or create) the database and run migrations
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    debug!(path = %path_str, "Opening database");
    Database::new(path_str).context("Failed to open database")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path)?;

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Record an expense: tally add 12.50 --category \"Food & Dining\"");
    println!("  2. Start web UI: tally serve");

    Ok(())
}

/// Parse an optional `YYYY-MM-DD` argument
pub fn parse_date_arg(flag: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
                .with_context(|| format!("Invalid {} date format (use YYYY-MM-DD)", flag))
        })
        .transpose()
}

/// The user's preferred currency, without creating a profile
pub fn preferred_currency(db: &Database, user: &str) -> Result<String> {
    Ok(db
        .get_profile(user)?
        .map(|p| p.preferred_currency)
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
}
