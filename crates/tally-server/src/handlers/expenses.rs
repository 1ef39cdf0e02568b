//! Expense handlers
//!
//! Every query is scoped to the authenticated user; an expense owned by
//! someone else is reported as not found.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use tally_core::models::{Expense, NewExpense};
use tally_core::validation::{ExpensePatch, RawExpenseInput};

use super::{parse_date_param, DataResponse};
use crate::{parse_json, AppError, AppState, AuthUser};

/// Query parameters for listing expenses
#[derive(Debug, Default, Deserialize)]
pub struct ExpenseListQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

/// Response for a deletion
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
    pub success: bool,
}

/// Path ids that are not integers cannot name an owned expense
fn parse_expense_id(raw: &str, action: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| not_owned(action))
}

fn not_owned(action: &str) -> AppError {
    AppError::not_found(&format!(
        "Expense not found or you do not have permission to {} it",
        action
    ))
}

/// GET /api/expenses - List the caller's expenses, newest first
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ExpenseListQuery>,
) -> Result<Json<DataResponse<Vec<Expense>>>, AppError> {
    let start = parse_date_param("startDate", params.start_date.as_deref())?;
    let end = parse_date_param("endDate", params.end_date.as_deref())?;

    let expenses = state.db.list_expenses(&user.id, start, end)?;
    Ok(Json(DataResponse::new(expenses)))
}

/// POST /api/expenses - Validate and record a new expense
pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<(StatusCode, Json<DataResponse<Expense>>), AppError> {
    let input: RawExpenseInput = parse_json(&body)?;
    let new_expense = NewExpense::try_from(&input).map_err(AppError::validation)?;

    let expense = state.db.insert_expense(&user.id, &new_expense)?;
    info!(user = %user.id, expense_id = expense.id, "Created expense");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(
            expense,
            "Expense created successfully",
        )),
    ))
}

/// PUT /api/expenses/:id - Merge a partial update onto a stored expense
///
/// The merged record is validated as a whole before anything is written.
pub async fn update_expense(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<DataResponse<Expense>>, AppError> {
    let id = parse_expense_id(&id, "update")?;
    let patch: ExpensePatch = parse_json(&body)?;

    let existing = state
        .db
        .get_expense(&user.id, id)?
        .ok_or_else(|| not_owned("update"))?;

    let candidate = patch.merge_onto(&existing);
    let update = NewExpense::try_from(&candidate).map_err(AppError::validation)?;

    let expense = state
        .db
        .update_expense(&user.id, id, &update)?
        .ok_or_else(|| not_owned("update"))?;
    info!(user = %user.id, expense_id = id, "Updated expense");

    Ok(Json(DataResponse::with_message(
        expense,
        "Expense updated successfully",
    )))
}

/// DELETE /api/expenses/:id - Delete one of the caller's expenses
pub async fn delete_expense(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = parse_expense_id(&id, "delete")?;

    if !state.db.delete_expense(&user.id, id)? {
        return Err(not_owned("delete"));
    }
    info!(user = %user.id, expense_id = id, "Deleted expense");

    Ok(Json(DeleteResponse {
        message: "Expense deleted successfully",
        success: true,
    }))
}
