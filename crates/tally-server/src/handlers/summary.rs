//! Summary handlers
//!
//! Load the caller's expenses once and run the pure aggregation functions
//! over them with today's date.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Month, Utc};
use serde::{Deserialize, Serialize};

use tally_core::aggregation::{
    aggregate_by_category, daily_spending, daily_window_len, month_from_index, monthly_summary,
    MAX_DAILY_WINDOW_DAYS,
};
use tally_core::currency::format_currency;
use tally_core::models::{CategoryAggregate, DailySpending, MonthlySummary, DEFAULT_CURRENCY};

use super::{parse_date_param, DataResponse};
use crate::{AppError, AppState, AuthUser};

/// Query parameters selecting a month window
///
/// `month` is zero-based (0 = January).
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
    pub year: Option<String>,
}

impl MonthQuery {
    fn parse(&self) -> Result<(Option<Month>, Option<i32>), AppError> {
        let month = match non_empty(&self.month) {
            None => None,
            Some(raw) => Some(
                raw.parse::<u32>()
                    .ok()
                    .and_then(month_from_index)
                    .ok_or_else(|| AppError::bad_request("month must be between 0 and 11"))?,
            ),
        };

        let year = match non_empty(&self.year) {
            None => None,
            Some(raw) => Some(
                raw.parse::<i32>()
                    .map_err(|_| AppError::bad_request("year must be a number"))?,
            ),
        };

        Ok((month, year))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Query parameters for the daily series
#[derive(Debug, Default, Deserialize)]
pub struct DailyQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

/// Monthly total plus its rendering in the caller's preferred currency
#[derive(Debug, Serialize)]
pub struct MonthlySummaryResponse {
    #[serde(flatten)]
    pub summary: MonthlySummary,
    pub currency: String,
    pub formatted_total: String,
}

/// GET /api/summary/monthly - Total spending for a month
pub async fn get_monthly_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<MonthQuery>,
) -> Result<Json<DataResponse<MonthlySummaryResponse>>, AppError> {
    let (month, year) = params.parse()?;
    let expenses = state.db.list_expenses(&user.id, None, None)?;
    let summary = monthly_summary(&expenses, month, year, Utc::now().date_naive());

    // Reading the summary must not create a profile
    let currency = state
        .db
        .get_profile(&user.id)?
        .map(|p| p.preferred_currency)
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    let formatted_total = format_currency(summary.total, Some(&currency));

    Ok(Json(DataResponse::new(MonthlySummaryResponse {
        summary,
        currency,
        formatted_total,
    })))
}

/// GET /api/summary/categories - Spending per category, largest first
pub async fn get_category_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<MonthQuery>,
) -> Result<Json<DataResponse<Vec<CategoryAggregate>>>, AppError> {
    let (month, year) = params.parse()?;
    let expenses = state.db.list_expenses(&user.id, None, None)?;

    Ok(Json(DataResponse::new(aggregate_by_category(
        &expenses,
        month,
        year,
        Utc::now().date_naive(),
    ))))
}

/// GET /api/summary/daily - Zero-filled daily totals
///
/// Ranges longer than [`MAX_DAILY_WINDOW_DAYS`] are rejected.
pub async fn get_daily_spending(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<DailyQuery>,
) -> Result<Json<DataResponse<Vec<DailySpending>>>, AppError> {
    let start = parse_date_param("startDate", params.start_date.as_deref())?;
    let end = parse_date_param("endDate", params.end_date.as_deref())?;
    let today = Utc::now().date_naive();

    if daily_window_len(start, end, today) > MAX_DAILY_WINDOW_DAYS {
        return Err(AppError::bad_request(&format!(
            "Date range cannot exceed {} days",
            MAX_DAILY_WINDOW_DAYS
        )));
    }

    let expenses = state.db.list_expenses(&user.id, start, end)?;

    Ok(Json(DataResponse::new(daily_spending(
        &expenses, start, end, today,
    ))))
}
