use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::codes;
use super::types::SettingResponse;
use super::{ApiError, AppState};

#[derive(Deserialize)]
pub struct PutSettingRequest {
    pub value: Option<String>,
}

/// GET /api/admin/settings/{key}
/// A missing key is its own error (1001), distinct from a storage fault.
pub async fn get_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<SettingResponse>, ApiError> {
    let value = state
        .store()
        .get_setting(&key)
        .await
        .map_err(|e| ApiError::storage(codes::SETTING_READ_FAILED, "Could not retrieve setting", e))?;

    match value {
        Some(value) => Ok(Json(SettingResponse { key, value })),
        None => {
            tracing::warn!("Could not retrieve setting ({key})");
            Err(ApiError::not_found_code(
                codes::SETTING_NOT_FOUND,
                "Could not retrieve setting",
            ))
        }
    }
}

/// POST /api/admin/settings/{key}
/// Writes answer with the stored pair. A request without a value is 1002.
pub async fn put_setting(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(payload): Json<PutSettingRequest>,
) -> Result<Json<SettingResponse>, ApiError> {
    let Some(value) = payload.value else {
        tracing::warn!("Trying to set setting ({key}) without a given value");
        return Err(ApiError::validation(codes::SETTING_NO_VALUE, "No value specified"));
    };

    state
        .store()
        .put_setting(&key, &value)
        .await
        .map_err(|e| ApiError::storage(codes::SETTING_WRITE_FAILED, "Could not store setting", e))?;

    Ok(Json(SettingResponse { key, value }))
}
