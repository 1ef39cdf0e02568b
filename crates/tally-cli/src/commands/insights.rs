//! AI insights command implementation

use anyhow::Result;
use tally_core::ai::{AIBackend, AIClient};
use tally_core::db::Database;
use tally_core::insights::{generate_spending_insights, missing_backend_failure};
use tally_core::models::SpendingInsights;
use tracing::warn;

use super::parse_date_arg;

pub async fn cmd_insights(
    db: &Database,
    user: &str,
    ai: Option<&AIClient>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<SpendingInsights> {
    let start = parse_date_arg("--from", from)?;
    let end = parse_date_arg("--to", to)?;

    let Some(ai) = ai else {
        let failure = missing_backend_failure();
        anyhow::bail!("{} (set GEMINI_API_KEY to enable insights)", failure);
    };

    let expenses = db.list_expenses(user, start, end)?;
    if expenses.is_empty() {
        anyhow::bail!("No expenses to analyze. Record some with: tally add");
    }

    println!(
        "🤖 Analyzing {} expenses with {}...",
        expenses.len(),
        ai.model()
    );

    let insights = generate_spending_insights(ai, &expenses)
        .await
        .map_err(|e| {
            let failure = e.classify();
            warn!(
                kind = %failure.kind,
                retryable = failure.retryable,
                "Failed to generate insights: {}",
                e
            );
            let hint = if failure.retryable {
                " (try again later)"
            } else {
                ""
            };
            anyhow::anyhow!("{}: {}{}", failure.kind, failure.message, hint)
        })?;

    println!();
    println!("💡 Spending Insights");
    println!("   ─────────────────────────────────────────────────────────────");
    for line in insights.insights.lines() {
        println!("   {}", line);
    }

    Ok(insights)
}
