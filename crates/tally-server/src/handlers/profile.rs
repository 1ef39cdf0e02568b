//! Profile handlers

use std::sync::Arc;

use axum::{body::Bytes, extract::State, Extension, Json};
use serde::Serialize;
use tracing::info;

use tally_core::models::{Profile, ProfileUpdate};
use tally_core::validation::RawProfileInput;

use super::DataResponse;
use crate::{parse_json, AppError, AppState, AuthUser};

/// Response for account deletion
#[derive(Debug, Serialize)]
pub struct AccountDeletedResponse {
    pub message: &'static str,
    /// Number of expenses removed with the account
    pub deleted_expenses: usize,
}

/// GET /api/profile - The caller's profile, created on first access
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DataResponse<Profile>>, AppError> {
    let profile = state.db.get_or_create_profile(&user.id)?;
    Ok(Json(DataResponse::new(profile)))
}

/// PUT /api/profile - Update name and/or preferred currency
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<Json<DataResponse<Profile>>, AppError> {
    let input: RawProfileInput = parse_json(&body)?;
    let update = ProfileUpdate::try_from(&input).map_err(AppError::validation)?;

    if update.is_empty() {
        return Err(AppError::bad_request("No valid fields to update"));
    }

    state.db.get_or_create_profile(&user.id)?;
    let profile = state
        .db
        .update_profile(&user.id, &update)?
        .ok_or_else(|| AppError::not_found("Profile not found"))?;
    info!(user = %user.id, "Updated profile");

    Ok(Json(DataResponse::with_message(
        profile,
        "Profile updated successfully",
    )))
}

/// DELETE /api/profile - Delete the caller's expenses and profile
pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AccountDeletedResponse>, AppError> {
    let deleted_expenses = state.db.delete_account(&user.id)?;
    info!(user = %user.id, deleted_expenses, "Deleted account");

    Ok(Json(AccountDeletedResponse {
        message: "Account deleted successfully",
        deleted_expenses,
    }))
}
