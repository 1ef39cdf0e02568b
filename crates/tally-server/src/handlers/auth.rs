//! Authentication-related handlers

use axum::{Extension, Json};
use serde::Serialize;

use crate::AuthUser;

/// Response for the /api/me endpoint
#[derive(Serialize)]
pub struct MeResponse {
    /// The authenticated user's email or identifier
    pub user: String,
    /// How the user was authenticated
    pub auth_method: String,
}

/// Get the currently authenticated user
pub async fn get_me(Extension(user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user: user.id,
        auth_method: user.method.as_str().to_string(),
    })
}
