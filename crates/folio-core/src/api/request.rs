//! Request options and response payloads for [`ApiClient::request`].
//!
//! [`ApiClient::request`]: super::ApiClient::request

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ApiError;

/// A file sent as `multipart/form-data`.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub field: String,
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Value),
    Multipart(UploadFile),
}

/// Per-call knobs. Built with the constructors and chained setters:
///
/// ```rust,ignore
/// let options = RequestOptions::post(json!({"title": "Hello"}))
///     .header("X-Draft", "1");
/// ```
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<RequestBody>,
    /// Merged over the default `Content-Type` and `Authorization` headers
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
    /// Report a 401 as a plain error without clearing the session
    pub skip_auth_check: bool,
    /// `None` means "cache if this is a GET"
    pub use_cache: Option<bool>,
    pub cache_ttl: Option<Duration>,
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: Vec::new(),
            params: Vec::new(),
            skip_auth_check: false,
            use_cache: None,
            cache_ttl: None,
            timeout: None,
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self::with_method(Method::POST).json(body)
    }

    pub fn put(body: Value) -> Self {
        Self::with_method(Method::PUT).json(body)
    }

    pub fn patch(body: Value) -> Self {
        Self::with_method(Method::PATCH).json(body)
    }

    pub fn delete() -> Self {
        Self::with_method(Method::DELETE)
    }

    pub fn with_method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn multipart(mut self, file: UploadFile) -> Self {
        self.body = Some(RequestBody::Multipart(file));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn skip_auth_check(mut self) -> Self {
        self.skip_auth_check = true;
        self
    }

    pub fn no_cache(mut self) -> Self {
        self.use_cache = Some(false);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Only GETs ever touch the cache; mutating methods always bypass it.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET && self.use_cache.unwrap_or(true)
    }
}

/// A successful response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// JSON content type; an empty body reads as `Null`
    Json(Value),
    /// Anything else, handed over untouched
    Raw {
        status: u16,
        content_type: Option<String>,
        body: Vec<u8>,
    },
}

impl ApiResponse {
    pub fn into_value(self) -> Result<Value, ApiError> {
        match self {
            ApiResponse::Json(value) => Ok(value),
            ApiResponse::Raw { body, .. } if body.is_empty() => Ok(Value::Null),
            ApiResponse::Raw { body, .. } => Ok(serde_json::from_slice(&body)?),
        }
    }

    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        Ok(serde_json::from_value(self.into_value()?)?)
    }

    pub fn text(&self) -> Option<String> {
        match self {
            ApiResponse::Json(value) => Some(value.to_string()),
            ApiResponse::Raw { body, .. } => String::from_utf8(body.clone()).ok(),
        }
    }
}
