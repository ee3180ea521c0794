use axum::{Json, extract::State};
use serde::Deserialize;
use std::sync::Arc;

use super::error::codes;
use super::validation::validate_password_pair;
use super::{ApiError, ApiResponse, AppState};
use crate::db::generate_code;

#[derive(Deserialize)]
pub struct ForgotRequest {
    pub username: String,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub code: String,
    pub password: String,
    pub verify_password: String,
}

/// POST /forgot
/// Store a reset code for the account and mail it out.
pub async fn forgot(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(ApiError::validation(codes::NO_USERNAME, "No username given"));
    }

    let code = generate_code();

    let known = state
        .store()
        .set_reset_code(username, &code)
        .await
        .map_err(|e| ApiError::storage(codes::RESET_FAILED, "Could not reset password", e))?;

    if !known {
        return Err(ApiError::validation(codes::INVALID_USERNAME, "Unknown username"));
    }

    state
        .mailer()
        .send_reset_code(username, &code, &state.config().server.base_url)
        .await
        .map_err(|e| ApiError::storage(codes::RESET_MAIL_FAILED, "Could not send reset mail", e))?;

    tracing::info!("Password reset requested: {username}");

    Ok(Json(ApiResponse::ok()))
}

/// POST /reset
/// Redeem a reset code and replace the account password.
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let code = payload.code.trim();
    if code.is_empty() {
        return Err(ApiError::validation(codes::INVALID_CODE, "No reset code given"));
    }
    validate_password_pair(&payload.password, &payload.verify_password)?;

    let user = state
        .store()
        .reset_user_password(code, &payload.password, &state.config().security)
        .await
        .map_err(|e| ApiError::storage(codes::RESET_FAILED, "Could not reset password", e))?;

    let Some(user) = user else {
        return Err(ApiError::validation(codes::INVALID_CODE, "Invalid reset code"));
    };

    tracing::info!("Password reset completed: {}", user.username);

    Ok(Json(ApiResponse::ok()))
}
