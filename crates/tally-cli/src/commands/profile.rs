//! Profile command implementations

use anyhow::{Context, Result};
use serde_json::Value;
use tally_core::db::Database;
use tally_core::models::{Profile, ProfileUpdate};
use tally_core::validation::RawProfileInput;
use tracing::info;

use super::describe_errors;

fn print_profile(profile: &Profile) {
    println!();
    println!("👤 Profile");
    println!("   ─────────────────────────────");
    println!("   User:     {}", profile.id);
    println!(
        "   Name:     {}",
        profile.name.as_deref().unwrap_or("(not set)")
    );
    println!("   Currency: {}", profile.preferred_currency);
}

pub fn cmd_profile_show(db: &Database, user: &str) -> Result<Profile> {
    let profile = db.get_or_create_profile(user)?;
    print_profile(&profile);
    Ok(profile)
}

pub fn cmd_profile_set(
    db: &Database,
    user: &str,
    name: Option<&str>,
    currency: Option<&str>,
) -> Result<Profile> {
    let input = RawProfileInput {
        name: name.map(Value::from),
        preferred_currency: currency.map(Value::from),
    };
    let update = ProfileUpdate::try_from(&input)
        .map_err(|errors| anyhow::anyhow!("Invalid profile:\n{}", describe_errors(&errors)))?;

    if update.is_empty() {
        anyhow::bail!("No valid fields to update (use --name and/or --currency)");
    }

    db.get_or_create_profile(user)?;
    let profile = db
        .update_profile(user, &update)?
        .context("Profile disappeared during update")?;

    println!("✅ Profile updated");
    print_profile(&profile);
    Ok(profile)
}

pub fn cmd_profile_delete(db: &Database, user: &str, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("This deletes every expense for {}. Re-run with --yes to confirm", user);
    }

    let removed = db.delete_account(user)?;
    info!(user = %user, expenses = removed, "Deleted account");
    println!(
        "🗑️  Deleted profile and {} expense{}",
        removed,
        if removed == 1 { "" } else { "s" }
    );
    Ok(())
}
