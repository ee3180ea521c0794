use axum::{
    Json,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::error::codes;
use super::{ApiError, ApiResponse, AppState};
use crate::db::UserRole;

pub const SESSION_USER_KEY: &str = "user";

/// Public identity kept in the session: everything a handler needs without
/// going back to storage. The session layer signs the cookie, so this is
/// tamper-evident on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i32,
    pub username: String,
    pub role: UserRole,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /login
/// Verify credentials and store the user's public identity in the session.
/// Any failure clears the session.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation(codes::NO_USERNAME, "Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation(codes::NO_PASSWORD, "Password is required"));
    }

    let user = state
        .store()
        .get_user_by_username(&payload.username)
        .await
        .map_err(|e| ApiError::storage(codes::LOGIN_FAILED, "Could not log in", e))?;

    let Some(user) = user else {
        let _ = session.flush().await;
        return Err(ApiError::unauthorized(
            codes::INVALID_CREDENTIALS,
            "Invalid username or password",
        ));
    };

    if user.activated_at.is_none() {
        let _ = session.flush().await;
        return Err(ApiError::unauthorized(
            codes::USER_NOT_ACTIVATED,
            "Account is not activated",
        ));
    }

    if !user.enabled {
        let _ = session.flush().await;
        return Err(ApiError::unauthorized(codes::USER_DISABLED, "Account is disabled"));
    }

    let is_valid = state
        .store()
        .verify_user_password(&payload.username, &payload.password)
        .await
        .map_err(|e| ApiError::storage(codes::LOGIN_FAILED, "Could not log in", e))?;

    if !is_valid {
        let _ = session.flush().await;
        return Err(ApiError::unauthorized(
            codes::INVALID_CREDENTIALS,
            "Invalid username or password",
        ));
    }

    let session_user = SessionUser {
        id: user.id,
        username: user.username.clone(),
        role: user.role,
    };
    session
        .insert(SESSION_USER_KEY, &session_user)
        .await
        .map_err(|e| ApiError::storage(codes::LOGIN_FAILED, "Could not create session", e))?;

    tracing::info!("User logged in: {}", user.username);

    Ok(Json(ApiResponse::ok()))
}

/// GET /logout
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    Redirect::to("/")
}

// ============================================================================
// Middleware & helpers
// ============================================================================

/// Resolve the current user from the session. A missing session and a
/// session that fails to decode are deliberately the same "not logged in".
pub async fn current_user(session: &Session) -> Result<SessionUser, ApiError> {
    session
        .get::<SessionUser>(SESSION_USER_KEY)
        .await
        .unwrap_or_default()
        .ok_or(ApiError::NotAuthenticated)
}

/// Require a logged-in user for the activity API
pub async fn require_user(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = current_user(&session).await?;
    tracing::Span::current().record("user", user.username.as_str());
    Ok(next.run(request).await)
}

/// Require an administrator. The admin surface is invisible to everyone
/// else, so a wrong role answers 404 rather than 403.
pub async fn require_admin(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = current_user(&session).await?;
    if user.role != UserRole::Administrator {
        return Err(ApiError::not_found("Not found"));
    }
    tracing::Span::current().record("user", user.username.as_str());
    Ok(next.run(request).await)
}
