use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::types::{ApiResponse, ErrorEntry};

/// Stable numeric error codes rendered in the JSON envelope. Clients key
/// off the code, the message is for humans.
pub mod codes {
    pub const SUCCESS: u32 = 0;

    // Authentication
    pub const NOT_AUTHENTICATED: u32 = 100;
    pub const INVALID_CREDENTIALS: u32 = 101;
    pub const USER_DISABLED: u32 = 102;
    pub const USER_NOT_ACTIVATED: u32 = 103;
    pub const FORBIDDEN: u32 = 104;
    pub const NOT_FOUND: u32 = 105;
    pub const LOGIN_FAILED: u32 = 110;

    // Settings. 1001 and 1002 are kept verbatim from the previous
    // generation of the settings API.
    pub const SETTING_NOT_FOUND: u32 = 1001;
    pub const SETTING_NO_VALUE: u32 = 1002;
    pub const SETTING_READ_FAILED: u32 = 1003;
    pub const SETTING_WRITE_FAILED: u32 = 1004;

    // Signup / activation / password reset
    pub const NO_USERNAME: u32 = 2001;
    pub const INVALID_USERNAME: u32 = 2002;
    pub const USERNAME_TAKEN: u32 = 2003;
    pub const NO_PASSWORD: u32 = 2004;
    pub const PASSWORD_MISMATCH: u32 = 2005;
    pub const INVALID_CODE: u32 = 2006;
    pub const SIGNUP_FAILED: u32 = 2010;
    pub const ACTIVATION_FAILED: u32 = 2011;
    pub const RESET_FAILED: u32 = 2012;
    pub const SIGNUP_MAIL_FAILED: u32 = 2013;
    pub const RESET_MAIL_FAILED: u32 = 2014;

    // Activities
    pub const NO_ACTIVITY_TITLE: u32 = 3001;
    pub const NO_ACTIVITY_COLOR: u32 = 3002;
    pub const INVALID_COLOR_HEX: u32 = 3003;
    pub const ACTIVITY_CREATE_FAILED: u32 = 3010;
    pub const ACTIVITY_LIST_FAILED: u32 = 3011;
    pub const NOT_SUPPORTED: u32 = 3012;

    // Admin user management
    pub const NO_USER_GIVEN: u32 = 4001;
    pub const INVALID_QUERY: u32 = 4002;
    pub const COULD_NOT_ENABLE_USER: u32 = 4010;
    pub const COULD_NOT_DISABLE_USER: u32 = 4011;
    pub const COULD_NOT_DELETE_USER: u32 = 4012;
    pub const COULD_NOT_CREATE_USER: u32 = 4013;
    pub const COULD_NOT_LIST_USERS: u32 = 4014;
    pub const STATISTICS_FAILED: u32 = 4015;
}

/// One violated validation rule
#[derive(Debug, Clone)]
pub struct FieldError {
    pub code: u32,
    pub message: String,
}

impl FieldError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Session absent or undecodable; both read the same from outside.
    NotAuthenticated,

    /// Logged in (or logging in) but not allowed: bad credentials, a
    /// disabled account, a pending signup.
    Unauthorized { code: u32, message: String },

    /// The operation exists but is switched off (feature flag on a POST).
    Forbidden(String),

    /// The resource does not exist, or is invisible to this caller.
    NotFound { code: u32, message: String },

    /// Client-caused input errors; one or many, always HTTP 400.
    Validation(Vec<FieldError>),

    /// A storage mutation or query failed. The code and message name the
    /// operation so callers can tell which mutation broke.
    Storage {
        code: u32,
        message: String,
        detail: String,
    },

    /// Declared in the contract but not supported in this snapshot.
    NotImplemented(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotAuthenticated => write!(f, "Not logged in"),
            ApiError::Unauthorized { message, .. } => write!(f, "Unauthorized: {}", message),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound { message, .. } => write!(f, "Not found: {}", message),
            ApiError::Validation(errors) => {
                let joined: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
                write!(f, "Validation error: {}", joined.join(", "))
            }
            ApiError::Storage { message, .. } => write!(f, "Storage error: {}", message),
            ApiError::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                ApiResponse::error(codes::NOT_AUTHENTICATED, "Not logged in"),
            ),
            ApiError::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, ApiResponse::error(code, message))
            }
            ApiError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                ApiResponse::error(codes::FORBIDDEN, message),
            ),
            ApiError::NotFound { code, message } => {
                (StatusCode::NOT_FOUND, ApiResponse::error(code, message))
            }
            ApiError::Validation(errors) => {
                let first = errors
                    .first()
                    .cloned()
                    .unwrap_or_else(|| FieldError::new(codes::INVALID_QUERY, "Invalid input"));
                let entries = errors
                    .into_iter()
                    .map(|e| ErrorEntry {
                        error: e.code,
                        message: e.message,
                    })
                    .collect();
                (
                    StatusCode::BAD_REQUEST,
                    ApiResponse::error(first.code, first.message).with_errors(entries),
                )
            }
            ApiError::Storage {
                code,
                message,
                detail,
            } => {
                tracing::error!("{message}: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::error(code, message),
                )
            }
            ApiError::NotImplemented(feature) => (
                StatusCode::NOT_IMPLEMENTED,
                ApiResponse::error(codes::NOT_SUPPORTED, format!("{feature} is not supported")),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl ApiError {
    /// Single validation error
    pub fn validation(code: u32, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(code, message)])
    }

    pub fn unauthorized(code: u32, message: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            code,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            code: codes::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn not_found_code(code: u32, message: impl Into<String>) -> Self {
        ApiError::NotFound {
            code,
            message: message.into(),
        }
    }

    /// Named storage fault; `detail` goes to the log, not the client.
    pub fn storage(code: u32, message: impl Into<String>, detail: impl fmt::Display) -> Self {
        ApiError::Storage {
            code,
            message: message.into(),
            detail: detail.to_string(),
        }
    }

    pub fn not_implemented(feature: &str) -> Self {
        ApiError::NotImplemented(feature.to_string())
    }
}
