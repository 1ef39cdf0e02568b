//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, date arguments)
//! - `expenses` - Record, list and delete expenses
//! - `insights` - AI spending insights
//! - `profile` - Profile management
//! - `reports` - Monthly summary, category breakdown, daily chart
//! - `serve` - Web server command

pub mod core;
pub mod expenses;
pub mod insights;
pub mod profile;
pub mod reports;
pub mod serve;

// Re-export command functions for main.rs
pub use core::*;
pub use expenses::*;
pub use insights::*;
pub use profile::*;
pub use reports::*;
pub use serve::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
