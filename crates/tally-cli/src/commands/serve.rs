//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    static_dir: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting Tally web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    // Comma-separated, each entry `key` or `key=user_id`
    let api_keys = tally_server::parse_api_keys(&std::env::var("TALLY_API_KEYS").unwrap_or_default());

    if no_auth {
        warn!("Starting server with authentication disabled");
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!("   🔒 Authentication: access proxy header (cf-access-authenticated-user-email)");
        if !api_keys.is_empty() {
            println!(
                "   🔑 API keys: {} configured (TALLY_API_KEYS)",
                api_keys.len()
            );
        }
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path)?;

    let config = tally_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins: vec![],
        api_keys,
    };

    let static_dir_str = static_dir
        .map(|p| p.to_str().context("Static directory path must be valid UTF-8"))
        .transpose()?;
    tally_server::serve_with_config(db, host, port, static_dir_str, config).await?;

    Ok(())
}
