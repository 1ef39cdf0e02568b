//! Tally CLI - Personal expense tracker
//!
//! Usage:
//!   tally init                                  Initialize database
//!   tally add 12.50 --category "Food & Dining"  Record an expense
//!   tally summary --month 2 --year 2024         Monthly total (0 = January)
//!   tally serve --port 3000                     Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let user = cli.user.as_str();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => commands::cmd_serve(&cli.db, &host, port, no_auth, static_dir.as_deref()).await,
        Commands::Add {
            amount,
            category,
            date,
            note,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_add(
                &db,
                user,
                amount,
                &category,
                date.as_deref(),
                note.as_deref(),
            )
            .map(|_| ())
        }
        Commands::List { from, to, json } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_list(&db, user, from.as_deref(), to.as_deref(), json)
        }
        Commands::Delete { id } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_delete(&db, user, id)
        }
        Commands::Summary { month, year } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_summary(&db, user, month, year).map(|_| ())
        }
        Commands::Categories { month, year } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_categories(&db, user, month, year).map(|_| ())
        }
        Commands::Daily { from, to } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_daily(&db, user, from.as_deref(), to.as_deref()).map(|_| ())
        }
        Commands::Insights { from, to } => {
            let db = commands::open_db(&cli.db)?;
            let ai = tally_core::ai::AIClient::from_env();
            commands::cmd_insights(&db, user, ai.as_ref(), from.as_deref(), to.as_deref())
                .await
                .map(|_| ())
        }
        Commands::Profile { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(ProfileAction::Show) => {
                    commands::cmd_profile_show(&db, user).map(|_| ())
                }
                Some(ProfileAction::Set { name, currency }) => {
                    commands::cmd_profile_set(&db, user, name.as_deref(), currency.as_deref())
                        .map(|_| ())
                }
                Some(ProfileAction::Delete { yes }) => {
                    commands::cmd_profile_delete(&db, user, yes)
                }
            }
        }
    }
}
