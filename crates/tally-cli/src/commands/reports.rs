//! Summary and chart command implementations

use anyhow::{Context, Result};
use chrono::{Month, Utc};
use tally_core::aggregation::{
    aggregate_by_category, daily_spending, daily_window_len, month_from_index, monthly_summary,
    MAX_DAILY_WINDOW_DAYS,
};
use tally_core::currency::format_currency;
use tally_core::db::Database;
use tally_core::models::{CategoryAggregate, DailySpending, MonthlySummary};

use super::{parse_date_arg, preferred_currency};

/// Width of the bar in chart output
const BAR_WIDTH: usize = 30;

fn month_arg(month: Option<u32>) -> Result<Option<Month>> {
    month
        .map(|m| month_from_index(m).context("--month must be between 0 and 11"))
        .transpose()
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(len.min(BAR_WIDTH))
}

pub fn cmd_summary(
    db: &Database,
    user: &str,
    month: Option<u32>,
    year: Option<i32>,
) -> Result<MonthlySummary> {
    let month = month_arg(month)?;
    let expenses = db.list_expenses(user, None, None)?;
    let summary = monthly_summary(&expenses, month, year, Utc::now().date_naive());
    let currency = preferred_currency(db, user)?;

    println!();
    println!("📊 {} {}", summary.month, summary.year);
    println!("   ─────────────────────────────");
    println!(
        "   Total spent: {}",
        format_currency(summary.total, Some(&currency))
    );

    Ok(summary)
}

pub fn cmd_categories(
    db: &Database,
    user: &str,
    month: Option<u32>,
    year: Option<i32>,
) -> Result<Vec<CategoryAggregate>> {
    let month = month_arg(month)?;
    let expenses = db.list_expenses(user, None, None)?;
    let categories = aggregate_by_category(&expenses, month, year, Utc::now().date_naive());

    if categories.is_empty() {
        println!("No expenses in this period.");
        return Ok(categories);
    }

    let currency = preferred_currency(db, user)?;
    let max = categories.first().map(|c| c.total).unwrap_or(0.0);

    println!();
    println!("📊 Spending by Category");
    println!("   ─────────────────────────────────────────────────────────────");
    for c in &categories {
        println!(
            "   {:<18} │ {:>12} │ {:>5.1}% │ {}",
            c.category.as_str(),
            format_currency(c.total, Some(&currency)),
            c.percentage,
            bar(c.total, max)
        );
    }

    Ok(categories)
}

pub fn cmd_daily(
    db: &Database,
    user: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Vec<DailySpending>> {
    let start = parse_date_arg("--from", from)?;
    let end = parse_date_arg("--to", to)?;
    let today = Utc::now().date_naive();

    if daily_window_len(start, end, today) > MAX_DAILY_WINDOW_DAYS {
        anyhow::bail!("Date range cannot exceed {} days", MAX_DAILY_WINDOW_DAYS);
    }

    let expenses = db.list_expenses(user, start, end)?;
    let points = daily_spending(&expenses, start, end, today);

    if points.is_empty() {
        println!("Empty date range.");
        return Ok(points);
    }

    let currency = preferred_currency(db, user)?;
    let max = points.iter().map(|p| p.total).fold(0.0, f64::max);

    println!();
    println!("📈 Daily Spending");
    println!("   ─────────────────────────────────────────────────────────────");
    for p in &points {
        println!(
            "   {} │ {:>12} │ {}",
            p.date,
            format_currency(p.total, Some(&currency)),
            bar(p.total, max)
        );
    }

    Ok(points)
}
