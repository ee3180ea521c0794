use axum::{Json, extract::State, response::Response};
use serde::Deserialize;
use std::sync::Arc;

use super::error::codes;
use super::validation::{valid_username, validate_password_pair};
use super::{ApiError, ApiResponse, AppState, pages};
use crate::db::generate_code;

pub const ALLOW_SIGNUPS: &str = "allow-signups";
pub const ALLOW_ACTIVATIONS: &str = "allow-activations";

/// Read a feature flag, mapping a storage failure to a named fault.
/// Callers turn `false` into 404 (GET) or 403 (POST).
pub(super) async fn flag_enabled(state: &AppState, key: &str) -> Result<bool, ApiError> {
    state
        .store()
        .flag_enabled(key)
        .await
        .map_err(|e| ApiError::storage(codes::SETTING_READ_FAILED, "Could not retrieve setting", e))
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
}

#[derive(Deserialize)]
pub struct ActivateRequest {
    pub code: String,
    pub password: String,
    pub verify_password: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /signup. The form only exists while signups are open.
pub async fn signup_page(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    if !flag_enabled(&state, ALLOW_SIGNUPS).await? {
        return Err(ApiError::not_found("Not found"));
    }
    Ok(pages::page("signup.html"))
}

/// POST /signup
/// Create a pending account and mail out its activation code.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    if !flag_enabled(&state, ALLOW_SIGNUPS).await? {
        return Err(ApiError::forbidden("Signups are disabled"));
    }

    let username = payload.username.trim();
    if username.is_empty() {
        return Err(ApiError::validation(codes::NO_USERNAME, "No username given"));
    }
    if !valid_username(username) {
        return Err(ApiError::validation(
            codes::INVALID_USERNAME,
            "Username must be an email address",
        ));
    }

    let existing = state
        .store()
        .get_user_by_username(username)
        .await
        .map_err(|e| ApiError::storage(codes::SIGNUP_FAILED, "Could not sign up", e))?;
    if existing.is_some() {
        return Err(ApiError::validation(
            codes::USERNAME_TAKEN,
            "Username is already taken",
        ));
    }

    let code = generate_code();

    state
        .store()
        .create_pending_user(username, &code)
        .await
        .map_err(|e| ApiError::storage(codes::SIGNUP_FAILED, "Could not sign up", e))?;

    state
        .mailer()
        .send_activation_code(username, &code, &state.config().server.base_url)
        .await
        .map_err(|e| {
            ApiError::storage(codes::SIGNUP_MAIL_FAILED, "Could not send activation mail", e)
        })?;

    tracing::info!("New signup: {username}");

    Ok(Json(ApiResponse::ok()))
}

/// GET /activate and /activate/{code}, gated like the signup form; the
/// page itself reads the code out of the URL
pub async fn activate_page(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    if !flag_enabled(&state, ALLOW_ACTIVATIONS).await? {
        return Err(ApiError::not_found("Not found"));
    }
    Ok(pages::page("activate.html"))
}

/// POST /activate
/// Redeem an activation code and set the account password.
pub async fn activate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ActivateRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    if !flag_enabled(&state, ALLOW_ACTIVATIONS).await? {
        return Err(ApiError::forbidden("Activations are disabled"));
    }

    let code = payload.code.trim();
    if code.is_empty() {
        return Err(ApiError::validation(codes::INVALID_CODE, "No activation code given"));
    }
    validate_password_pair(&payload.password, &payload.verify_password)?;

    let user = state
        .store()
        .activate_user(code, &payload.password, &state.config().security)
        .await
        .map_err(|e| ApiError::storage(codes::ACTIVATION_FAILED, "Could not activate account", e))?;

    let Some(user) = user else {
        return Err(ApiError::validation(codes::INVALID_CODE, "Invalid activation code"));
    };

    tracing::info!("Account activated: {}", user.username);

    Ok(Json(ApiResponse::ok()))
}
