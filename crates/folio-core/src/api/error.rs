use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::truncate_string;

pub const TIMEOUT_DETAIL: &str = "請求超時，請檢查網路連線";
pub const UNAUTHORIZED_DETAIL: &str = "登入已過期，請重新登入";
pub const FORBIDDEN_DETAIL: &str = "權限不足，無法執行此操作";
pub const NOT_FOUND_DETAIL: &str = "請求的資源不存在";
pub const RATE_LIMITED_DETAIL: &str = "請求過於頻繁，請稍後再試";
pub const SERVER_ERROR_DETAIL: &str = "伺服器錯誤，請稍後再試";

/// Every failure the request pipeline can produce.
///
/// `status()` and `detail()` give the normalized `{detail, status}` view,
/// so callers need only one error-handling idiom.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("{}", TIMEOUT_DETAIL)]
    Timeout,

    #[error("{}", UNAUTHORIZED_DETAIL)]
    Unauthorized,

    #[error("{}", FORBIDDEN_DETAIL)]
    Forbidden,

    #[error("{}", NOT_FOUND_DETAIL)]
    NotFound,

    #[error("{}", RATE_LIMITED_DETAIL)]
    RateLimited,

    #[error("{} ({status})", SERVER_ERROR_DETAIL)]
    Server { status: u16 },

    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("Invalid response: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Session storage error: {0}")]
    Storage(String),
}

/// Normalized error shape, as handed to front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct ErrorBody {
    pub detail: String,
    pub status: u16,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct DetailBody {
    detail: serde_json::Value,
}

impl ApiError {
    /// Map a non-success status (other than the 401 session case) to an error.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound,
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server { status },
            _ => ApiError::Http {
                status,
                detail: Self::body_detail(body),
            },
        }
    }

    /// Error carrying the server's own message, e.g. "wrong password" on login.
    pub fn from_body(status: u16, body: &str) -> Self {
        ApiError::Http {
            status,
            detail: Self::body_detail(body),
        }
    }

    /// The `detail` field of a JSON error body, or the truncated raw text.
    fn body_detail(body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<DetailBody>(body) {
            return match parsed.detail {
                serde_json::Value::String(s) => s,
                other => truncate_string(&other.to_string(), MAX_ERROR_BODY_LENGTH),
            };
        }
        truncate_string(body.trim(), MAX_ERROR_BODY_LENGTH)
    }

    pub fn status(&self) -> u16 {
        match self {
            ApiError::Network(_)
            | ApiError::Parse(_)
            | ApiError::InvalidRequest(_)
            | ApiError::Storage(_) => 0,
            ApiError::Timeout => 408,
            ApiError::Unauthorized => 401,
            ApiError::Forbidden => 403,
            ApiError::NotFound => 404,
            ApiError::RateLimited => 429,
            ApiError::Server { status } | ApiError::Http { status, .. } => *status,
            ApiError::Validation(_) => 422,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ApiError::Network(msg)
            | ApiError::Parse(msg)
            | ApiError::InvalidRequest(msg)
            | ApiError::Validation(msg)
            | ApiError::Storage(msg) => msg.clone(),
            ApiError::Timeout => TIMEOUT_DETAIL.to_string(),
            ApiError::Unauthorized => UNAUTHORIZED_DETAIL.to_string(),
            ApiError::Forbidden => FORBIDDEN_DETAIL.to_string(),
            ApiError::NotFound => NOT_FOUND_DETAIL.to_string(),
            ApiError::RateLimited => RATE_LIMITED_DETAIL.to_string(),
            ApiError::Server { .. } => SERVER_ERROR_DETAIL.to_string(),
            ApiError::Http { detail, .. } => detail.clone(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            detail: self.detail(),
            status: self.status(),
        }
    }

    /// Only connectivity failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    /// The session was rejected and has been cleared.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_builder() {
            ApiError::InvalidRequest(err.to_string())
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Network(network_message(&err))
        }
    }
}

/// Include the innermost cause; reqwest's top-level message alone is vague.
fn network_message(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    let mut innermost = None;
    while let Some(cause) = source {
        innermost = Some(cause.to_string());
        source = cause.source();
    }
    if let Some(cause) = innermost {
        message = format!("{}: {}", message, cause);
    }
    message
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Storage(format!("{:#}", err))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}
