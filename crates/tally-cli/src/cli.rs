//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Track expenses and understand your spending
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Self-hosted personal expense tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, env = "TALLY_DB", default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Owner of the expenses managed from the command line
    #[arg(long, env = "TALLY_USER", default_value = "local-dev", global = true)]
    pub user: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires the access proxy header or an API key.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Record an expense
    Add {
        /// Amount spent (must be greater than 0)
        #[arg(allow_negative_numbers = true)]
        amount: f64,

        /// Category label, e.g. "Food & Dining"
        #[arg(short, long)]
        category: String,

        /// Date of the expense (YYYY-MM-DD, defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Free-form note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// List expenses, newest first
    List {
        /// Earliest date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Latest date to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an expense
    Delete {
        /// Expense ID
        id: i64,
    },

    /// Show total spending for a month
    Summary {
        /// Zero-based month index (0 = January); defaults to the current month
        #[arg(short, long)]
        month: Option<u32>,

        /// Year; defaults to the current year
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Show spending per category
    ///
    /// Without --month or --year every expense is included.
    Categories {
        /// Zero-based month index (0 = January)
        #[arg(short, long)]
        month: Option<u32>,

        /// Year
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Show day-by-day spending (defaults to the last 30 days)
    Daily {
        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Last day of the range (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Generate AI spending insights (requires GEMINI_API_KEY)
    Insights {
        /// Earliest date to analyze (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Latest date to analyze (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Show or update the profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the profile (default)
    Show,

    /// Update name and/or preferred currency
    Set {
        /// Display name (empty string clears it)
        #[arg(long)]
        name: Option<String>,

        /// Preferred currency code, e.g. EUR
        #[arg(long)]
        currency: Option<String>,
    },

    /// Delete the profile and every expense
    Delete {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}
