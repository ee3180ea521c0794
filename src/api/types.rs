use serde::Serialize;

use super::error::codes;
use super::pagination::PaginationLink;
use crate::db::{Activity, User};

/// Fixed JSON envelope: `{"error": <code>, "message": <text>}`. When more
/// than one validation rule failed at once, `errors` lists every violation.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub error: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorEntry>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorEntry {
    pub error: u32,
    pub message: String,
}

impl ApiResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            error: codes::SUCCESS,
            message: "Ok".to_string(),
            errors: None,
        }
    }

    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self {
            error: code,
            message: message.into(),
            errors: None,
        }
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<ErrorEntry>) -> Self {
        self.errors = Some(errors);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityDto {
    pub id: i32,
    pub title: String,
    pub color: String,
}

impl From<Activity> for ActivityDto {
    fn from(activity: Activity) -> Self {
        Self {
            id: activity.id,
            title: activity.title,
            color: activity.color,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivityDto>,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub username: String,
    pub role: &'static str,
    pub enabled: bool,
    pub activated: bool,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            role: user.role.as_str(),
            enabled: user.enabled,
            activated: user.activated_at.is_some(),
            created_at: user.created_at,
        }
    }
}

/// Listing payload for the admin user table. A bad `start`/`count` query
/// still answers 200, with the error code set and everything else empty.
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub error: u32,
    pub message: String,
    pub users: Vec<UserDto>,
    pub pagination: Vec<PaginationLink>,
    pub total: u64,
}

impl UserListResponse {
    #[must_use]
    pub fn invalid_query() -> Self {
        Self {
            error: codes::INVALID_QUERY,
            message: "Invalid start or count".to_string(),
            users: Vec::new(),
            pagination: Vec::new(),
            total: 0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub users: u64,
    pub signups: u64,
}

#[derive(Debug, Serialize)]
pub struct SettingResponse {
    pub key: String,
    pub value: String,
}
