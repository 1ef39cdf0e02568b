//! Expense command implementations

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tally_core::currency::format_currency;
use tally_core::db::Database;
use tally_core::models::{Expense, NewExpense};
use tally_core::validation::{RawExpenseInput, ValidationErrors};
use tracing::info;

use super::{parse_date_arg, preferred_currency, truncate};

/// Render every field error, one per line
pub fn describe_errors(errors: &ValidationErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("  {}: {}", field, message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validate and store an expense, returning the stored record
pub fn cmd_add(
    db: &Database,
    user: &str,
    amount: f64,
    category: &str,
    date: Option<&str>,
    note: Option<&str>,
) -> Result<Expense> {
    let date = date
        .map(str::to_string)
        .unwrap_or_else(|| Utc::now().date_naive().format("%Y-%m-%d").to_string());

    // Same validation path as the API
    let input = RawExpenseInput {
        amount: serde_json::Number::from_f64(amount).map(Value::Number),
        category: Some(Value::from(category)),
        note: note.map(Value::from),
        date: Some(Value::from(date)),
    };
    let new_expense = NewExpense::try_from(&input)
        .map_err(|errors| anyhow::anyhow!("Invalid expense:\n{}", describe_errors(&errors)))?;

    let expense = db
        .insert_expense(user, &new_expense)
        .context("Failed to record expense")?;

    let currency = preferred_currency(db, user)?;
    println!(
        "✅ Recorded expense #{}: {} on {} ({})",
        expense.id,
        format_currency(expense.amount, Some(&currency)),
        expense.date,
        expense.category
    );

    Ok(expense)
}

pub fn cmd_list(
    db: &Database,
    user: &str,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> Result<()> {
    let from: Option<NaiveDate> = parse_date_arg("--from", from)?;
    let to: Option<NaiveDate> = parse_date_arg("--to", to)?;
    let expenses = db.list_expenses(user, from, to)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&expenses)?);
        return Ok(());
    }

    if expenses.is_empty() {
        println!("No expenses found. Record one with:");
        println!("  tally add 12.50 --category \"Food & Dining\"");
        return Ok(());
    }

    let currency = preferred_currency(db, user)?;

    println!();
    println!("📝 Expenses");
    println!("   ─────────────────────────────────────────────────────────────");

    for expense in &expenses {
        println!(
            "   {:>5} │ {} │ {:>12} │ {:<18} │ {}",
            expense.id,
            expense.date,
            format_currency(expense.amount, Some(&currency)),
            expense.category,
            truncate(expense.note.as_deref().unwrap_or(""), 30)
        );
    }

    let total: f64 = expenses.iter().map(|e| e.amount).sum();
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {} expenses, {} total",
        expenses.len(),
        format_currency(total, Some(&currency))
    );

    Ok(())
}

pub fn cmd_delete(db: &Database, user: &str, id: i64) -> Result<()> {
    if !db.delete_expense(user, id)? {
        anyhow::bail!(
            "Expense not found or you do not have permission to delete it: {}",
            id
        );
    }

    info!(user = %user, id, "Deleted expense");
    println!("🗑️  Deleted expense #{}", id);
    Ok(())
}
