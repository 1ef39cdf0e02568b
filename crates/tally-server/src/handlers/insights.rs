//! AI insight handlers

use std::sync::Arc;

use axum::{body::Bytes, extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use tally_core::insights::{generate_spending_insights, missing_backend_failure};
use tally_core::models::{Expense, SpendingInsights};

use super::DataResponse;
use crate::{parse_json, AppError, AppState, AuthUser};

/// Request body for insight generation
#[derive(Debug, Deserialize)]
pub struct InsightsRequest {
    #[serde(default)]
    pub expenses: Option<Value>,
}

/// POST /api/insights - Generate AI spending insights
///
/// The submitted expenses must all belong to the caller, both by their
/// `user_id` field and by the stored records their ids refer to.
pub async fn generate_insights(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<Json<DataResponse<SpendingInsights>>, AppError> {
    let request: InsightsRequest = parse_json(&body)?;

    let expenses = match request.expenses {
        Some(Value::Array(items)) if !items.is_empty() => {
            serde_json::from_value::<Vec<Expense>>(Value::Array(items))
                .map_err(|e| AppError::bad_request(&format!("Invalid expense data: {}", e)))?
        }
        _ => {
            return Err(AppError::bad_request(
                "Expense data is required and must be a non-empty array",
            ))
        }
    };

    let ids: Vec<i64> = expenses.iter().map(|e| e.id).collect();
    let foreign = state.db.foreign_expense_ids(&user.id, &ids)?;
    if !foreign.is_empty() || expenses.iter().any(|e| e.user_id != user.id) {
        warn!(user = %user.id, foreign = ?foreign, "Rejected insight request for foreign expenses");
        return Err(AppError::forbidden(
            "You can only generate insights for your own expenses",
        ));
    }

    let Some(ai) = state.ai.as_ref() else {
        return Err(missing_backend_failure().into());
    };

    let insights = generate_spending_insights(ai, &expenses).await?;
    info!(user = %user.id, expenses = expenses.len(), "Generated spending insights");

    Ok(Json(DataResponse::with_message(
        insights,
        "Insights generated successfully",
    )))
}
