use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{FieldError, codes};
use super::pagination::generate_pagination;
use super::types::{StatisticsResponse, UserDto, UserListResponse};
use super::validation::{parse_index_argument, valid_username, validate_password_pair};
use super::{ApiError, ApiResponse, AppState};
use crate::db::UserRole;

/// Rows per page when the listing query does not say
const DEFAULT_PAGE_SIZE: u64 = 5;

#[derive(Deserialize)]
pub struct UserListQuery {
    pub start: Option<String>,
    pub count: Option<String>,
    pub filter: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub verify_password: String,
    #[serde(default)]
    pub administrator: bool,
}

// ============================================================================
// Listing
// ============================================================================

/// GET /api/admin/users?start=&count=&filter=
/// Paginated user listing. Non-numeric paging input renders an empty,
/// error-flagged result set instead of a fault.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    let (Some(start), Some(count)) = (
        parse_index_argument(query.start.as_deref(), 0),
        parse_index_argument(query.count.as_deref(), DEFAULT_PAGE_SIZE),
    ) else {
        return Ok(Json(UserListResponse::invalid_query()));
    };

    let filter = query.filter.as_deref().filter(|f| !f.is_empty());

    let total = state
        .store()
        .count_users(filter)
        .await
        .map_err(|e| ApiError::storage(codes::COULD_NOT_LIST_USERS, "Could not list users", e))?;

    let users = state
        .store()
        .list_users(start, count, filter)
        .await
        .map_err(|e| ApiError::storage(codes::COULD_NOT_LIST_USERS, "Could not list users", e))?;

    let pagination =
        generate_pagination(total as usize, start as usize, count as usize, filter);

    Ok(Json(UserListResponse {
        error: codes::SUCCESS,
        message: "Ok".to_string(),
        users: users.into_iter().map(UserDto::from).collect(),
        pagination,
        total,
    }))
}

// ============================================================================
// Account lifecycle
// ============================================================================

/// POST /api/admin/users
/// Create an immediately active account from the admin console.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let username = payload.username.trim();

    let mut errors = Vec::new();
    if username.is_empty() {
        errors.push(FieldError::new(codes::NO_USERNAME, "No username given"));
    } else if !valid_username(username) {
        errors.push(FieldError::new(
            codes::INVALID_USERNAME,
            "Username must be an email address",
        ));
    }
    if let Err(ApiError::Validation(mut password_errors)) =
        validate_password_pair(&payload.password, &payload.verify_password)
    {
        errors.append(&mut password_errors);
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let existing = state
        .store()
        .get_user_by_username(username)
        .await
        .map_err(|e| ApiError::storage(codes::COULD_NOT_CREATE_USER, "Could not create user", e))?;
    if existing.is_some() {
        return Err(ApiError::validation(
            codes::USERNAME_TAKEN,
            "Username is already taken",
        ));
    }

    let role = if payload.administrator {
        UserRole::Administrator
    } else {
        UserRole::Normal
    };

    state
        .store()
        .create_user(username, &payload.password, role, &state.config().security)
        .await
        .map_err(|e| ApiError::storage(codes::COULD_NOT_CREATE_USER, "Could not create user", e))?;

    tracing::info!("Admin created user: {username}");

    Ok(Json(ApiResponse::ok()))
}

/// POST /api/admin/users/{username}/enable
pub async fn enable_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    let username = require_username(&username)?;

    state
        .store()
        .set_user_enabled(username, true)
        .await
        .map_err(|e| ApiError::storage(codes::COULD_NOT_ENABLE_USER, "Could not enable user", e))?;

    Ok(Json(ApiResponse::ok()))
}

/// POST /api/admin/users/{username}/disable
/// Disabling twice is fine; the end state is the same.
pub async fn disable_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    let username = require_username(&username)?;

    state
        .store()
        .set_user_enabled(username, false)
        .await
        .map_err(|e| ApiError::storage(codes::COULD_NOT_DISABLE_USER, "Could not disable user", e))?;

    Ok(Json(ApiResponse::ok()))
}

/// POST /api/admin/users/{username}/delete
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse>, ApiError> {
    let username = require_username(&username)?;

    state
        .store()
        .delete_user(username)
        .await
        .map_err(|e| ApiError::storage(codes::COULD_NOT_DELETE_USER, "Could not delete user", e))?;

    tracing::info!("Admin deleted user: {username}");

    Ok(Json(ApiResponse::ok()))
}

/// GET /api/admin/statistics
pub async fn statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let users = state
        .store()
        .count_users(None)
        .await
        .map_err(|e| ApiError::storage(codes::STATISTICS_FAILED, "Could not compute statistics", e))?;

    let signups = state
        .store()
        .count_pending_signups()
        .await
        .map_err(|e| ApiError::storage(codes::STATISTICS_FAILED, "Could not compute statistics", e))?;

    Ok(Json(StatisticsResponse { users, signups }))
}

/// Bad input ("no user given") stays distinct from storage faults
fn require_username(username: &str) -> Result<&str, ApiError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(codes::NO_USER_GIVEN, "No user given"));
    }
    Ok(trimmed)
}
