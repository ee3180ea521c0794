use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::current_user;
use super::error::{FieldError, codes};
use super::types::{ActivitiesResponse, ActivityDto};
use super::validation::valid_color_hex;
use super::{ApiError, ApiResponse, AppState};

#[derive(Deserialize)]
pub struct CreateActivityRequest {
    pub title: String,
    pub color: String,
}

/// GET /api/activities
/// The complete list of the current user's activities; owning none is an
/// empty list, not an error.
pub async fn list_activities(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ActivitiesResponse>, ApiError> {
    let user = current_user(&session).await?;

    let activities = state
        .store()
        .get_activities(user.id)
        .await
        .map_err(|e| ApiError::storage(codes::ACTIVITY_LIST_FAILED, "Could not list activities", e))?;

    Ok(Json(ActivitiesResponse {
        activities: activities.into_iter().map(ActivityDto::from).collect(),
    }))
}

/// POST /api/activities
/// Create a new activity. Every violated rule is reported, not just the
/// first one.
pub async fn create_activity(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<CreateActivityRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let user = current_user(&session).await?;

    let title = payload.title.trim();
    let color = payload.color.trim();

    let mut errors = Vec::new();
    if title.is_empty() {
        errors.push(FieldError::new(codes::NO_ACTIVITY_TITLE, "No title given"));
    }
    if color.is_empty() {
        errors.push(FieldError::new(codes::NO_ACTIVITY_COLOR, "No color given"));
    }
    if !valid_color_hex(color) {
        errors.push(FieldError::new(
            codes::INVALID_COLOR_HEX,
            "Color is not a valid hex color",
        ));
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    state
        .store()
        .add_activity(user.id, title, color)
        .await
        .map_err(|e| ApiError::storage(codes::ACTIVITY_CREATE_FAILED, "Could not create activity", e))?;

    tracing::info!("Activity created for {}: {title}", user.username);

    Ok(Json(ApiResponse::ok()))
}

/// PUT /api/activities/{id}: declared in the contract, not supported yet
pub async fn update_activity(Path(_id): Path<i32>) -> ApiError {
    ApiError::not_implemented("Activity update")
}

/// DELETE /api/activities/{id}: declared in the contract, not supported yet
pub async fn delete_activity(Path(_id): Path<i32>) -> ApiError {
    ApiError::not_implemented("Activity delete")
}
