//! API client for communicating with the folio REST API.
//!
//! Every call goes through [`ApiClient::request`]: build the URL and headers,
//! dispatch with a timeout, classify the status, and retry connectivity
//! failures a bounded number of times with a fixed delay.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::request::{ApiResponse, RequestBody, RequestOptions, UploadFile};
use super::ApiError;
use crate::auth::TokenManager;
use crate::cache::{cache_key, CacheManager};
use crate::config::Config;

// ============================================================================
// Constants
// ============================================================================

/// A 401 from this endpoint means bad credentials, not an expired session.
pub const LOGIN_ENDPOINT: &str = "/auth/login";

const JSON_CONTENT_TYPE: &str = "application/json";

type SharedRequest = Shared<BoxFuture<'static, Result<ApiResponse, ApiError>>>;

/// API client for the folio backend.
/// Clone is cheap - the connection pool, token manager, cache and in-flight
/// map are all shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<TokenManager>,
    cache: Arc<CacheManager>,
    in_flight: Arc<Mutex<HashMap<String, SharedRequest>>>,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    cache_ttl: Duration,
}

impl ApiClient {
    pub fn new(config: &Config, tokens: Arc<TokenManager>, cache: Arc<CacheManager>) -> Result<Self> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url(),
            tokens,
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            timeout: config.request_timeout(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            cache_ttl: config.cache_ttl(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    /// Issue a request and normalize the outcome.
    ///
    /// Cacheable GETs are answered from the cache when fresh, and concurrent
    /// identical GETs share a single network call.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse, ApiError> {
        if !options.is_cacheable() {
            return self.send_with_retry(endpoint, &options).await;
        }

        let key = cache_key(endpoint, &options.params);
        if let Some(data) = self.cache.get(&key) {
            debug!(key = %key, "Cache hit");
            return Ok(ApiResponse::Json(data));
        }

        let shared = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match in_flight.get(&key) {
                Some(existing) => {
                    debug!(key = %key, "Joining in-flight request");
                    existing.clone()
                }
                None => {
                    let fut = self.fetch_and_cache(endpoint.to_string(), key.clone(), options);
                    in_flight.insert(key.clone(), fut.clone());
                    fut
                }
            }
        };

        let result = shared.clone().await;

        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if in_flight.get(&key).is_some_and(|current| current.ptr_eq(&shared)) {
            in_flight.remove(&key);
        }
        result
    }

    fn fetch_and_cache(&self, endpoint: String, key: String, options: RequestOptions) -> SharedRequest {
        let this = self.clone();
        let ttl = options.cache_ttl.unwrap_or(self.cache_ttl);
        // A clear while in flight (login, logout) means this response
        // belongs to the previous identity and must not be cached
        let generation = self.cache.generation();
        async move {
            let response = this.send_with_retry(&endpoint, &options).await?;
            if let ApiResponse::Json(ref data) = response {
                if !this.cache.set_if_generation(key.as_str(), data.clone(), ttl, generation) {
                    debug!(key = %key, "Cache cleared during request, not storing");
                }
            }
            Ok(response)
        }
        .boxed()
        .shared()
    }

    async fn send_with_retry(&self, endpoint: &str, options: &RequestOptions) -> Result<ApiResponse, ApiError> {
        let mut retries_left = self.max_retries;

        loop {
            match self.send_once(endpoint, options).await {
                Err(err) if err.is_retryable() && retries_left > 0 => {
                    retries_left -= 1;
                    warn!(
                        endpoint = endpoint,
                        retries_left = retries_left,
                        delay_ms = self.retry_delay.as_millis() as u64,
                        error = %err,
                        "Network error, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                other => return other,
            }
        }
    }

    async fn send_once(&self, endpoint: &str, options: &RequestOptions) -> Result<ApiResponse, ApiError> {
        let url = self.url(endpoint);
        let headers = self.build_headers(options)?;

        let mut request = self
            .client
            .request(options.method.clone(), &url)
            .headers(headers)
            .timeout(options.timeout.unwrap_or(self.timeout));

        if !options.params.is_empty() {
            request = request.query(&options.params);
        }

        request = match &options.body {
            Some(RequestBody::Json(value)) => {
                let bytes = serde_json::to_vec(value)
                    .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
                request.body(bytes)
            }
            Some(RequestBody::Multipart(file)) => request.multipart(Self::multipart_form(file)?),
            None => request,
        };

        debug!(method = %options.method, url = %url, "Dispatching request");
        let response = request.send().await?;
        self.classify(endpoint, options, response).await
    }

    async fn classify(
        &self,
        endpoint: &str,
        options: &RequestOptions,
        response: reqwest::Response,
    ) -> Result<ApiResponse, ApiError> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            if options.skip_auth_check || Self::is_login_endpoint(endpoint) {
                return Err(ApiError::from_body(status.as_u16(), &body));
            }
            warn!(endpoint = endpoint, "Session rejected, clearing token");
            if let Err(e) = self.tokens.clear_token() {
                warn!(error = %e, "Failed to clear rejected token");
            }
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(endpoint = endpoint, status = status.as_u16(), "Request failed");
            return Err(ApiError::from_status(status.as_u16(), &body));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await?;

        match content_type {
            Some(ref ct) if ct.contains(JSON_CONTENT_TYPE) => {
                if body.is_empty() {
                    return Ok(ApiResponse::Json(Value::Null));
                }
                let value = serde_json::from_slice(&body).map_err(|e| {
                    ApiError::Parse(format!("Failed to parse JSON response from {}: {}", endpoint, e))
                })?;
                Ok(ApiResponse::Json(value))
            }
            _ => Ok(ApiResponse::Raw {
                status: status.as_u16(),
                content_type,
                body: body.to_vec(),
            }),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    fn is_login_endpoint(endpoint: &str) -> bool {
        let path = endpoint.split('?').next().unwrap_or(endpoint);
        path.trim_end_matches('/').ends_with(LOGIN_ENDPOINT)
    }

    /// Defaults first, then caller headers on top.
    fn build_headers(&self, options: &RequestOptions) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();

        // reqwest supplies the multipart boundary itself
        if !matches!(options.body, Some(RequestBody::Multipart(_))) {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }

        if let Some(auth) = self.tokens.authorization_header() {
            let value = HeaderValue::from_str(&auth)
                .map_err(|e| ApiError::InvalidRequest(format!("Invalid auth header: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::InvalidRequest(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::InvalidRequest(format!("Invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    fn multipart_form(file: &UploadFile) -> Result<reqwest::multipart::Form, ApiError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(&file.mime)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid MIME type {}: {}", file.mime, e)))?;
        Ok(reqwest::multipart::Form::new().part(file.field.clone(), part))
    }

    // ===== Typed helpers =====

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(endpoint, RequestOptions::get()).await?.json()
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let options = params
            .iter()
            .fold(RequestOptions::get(), |options, (k, v)| options.param(*k, *v));
        self.request(endpoint, options).await?.json()
    }

    /// GET that neither reads nor fills the cache
    pub async fn get_fresh<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.request(endpoint, RequestOptions::get().no_cache()).await?.json()
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(endpoint, RequestOptions::post(Self::to_value(body)?))
            .await?
            .json()
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(endpoint, RequestOptions::put(Self::to_value(body)?))
            .await?
            .json()
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(endpoint, RequestOptions::patch(Self::to_value(body)?))
            .await?
            .json()
    }

    /// DELETE, discarding whatever body comes back
    pub async fn delete(&self, endpoint: &str) -> Result<(), ApiError> {
        self.request(endpoint, RequestOptions::delete()).await?;
        Ok(())
    }

    pub async fn upload<T: DeserializeOwned>(&self, endpoint: &str, file: UploadFile) -> Result<T, ApiError> {
        let options = RequestOptions::with_method(reqwest::Method::POST).multipart(file);
        self.request(endpoint, options).await?.json()
    }

    /// Forget every cached and in-flight GET. Requests already running still
    /// complete for their callers, but nobody new joins them and their
    /// responses are not cached.
    pub fn reset_session(&self) {
        self.cache.clear();
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Drop cached GETs under `prefix`. Writes never do this on their own.
    pub fn invalidate(&self, prefix: &str) -> usize {
        let removed = self.cache.delete_prefix(prefix);
        if removed > 0 {
            debug!(prefix = prefix, removed = removed, "Invalidated cache entries");
        }
        removed
    }

    fn to_value<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
        serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;

    fn client(base: &str) -> ApiClient {
        let tokens = Arc::new(TokenManager::new(MemoryTokenStore::new()));
        ApiClient::new(&Config::with_base_url(base), tokens, Arc::new(CacheManager::new()))
            .expect("Failed to build test client")
    }

    #[test]
    fn test_is_login_endpoint() {
        assert!(ApiClient::is_login_endpoint("/auth/login"));
        assert!(ApiClient::is_login_endpoint("/auth/login/"));
        assert!(ApiClient::is_login_endpoint("/auth/login?next=/admin"));
        assert!(!ApiClient::is_login_endpoint("/auth/me"));
        assert!(!ApiClient::is_login_endpoint("/auth/logout"));
    }

    #[test]
    fn test_url_joining() {
        let api = client("http://localhost:9/api/v1");
        assert_eq!(api.url("/blog/public"), "http://localhost:9/api/v1/blog/public");
        assert_eq!(api.url("health"), "http://localhost:9/api/v1/health");
        assert_eq!(api.url("https://cdn.example.com/x"), "https://cdn.example.com/x");
    }

    #[test]
    fn test_headers_without_token() {
        let api = client("http://localhost:9");
        let headers = api.build_headers(&RequestOptions::get()).unwrap();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), JSON_CONTENT_TYPE);
        assert!(headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_caller_headers_override_defaults() {
        let api = client("http://localhost:9");
        api.tokens().set_token("abc", None, None, false).unwrap();
        let options = RequestOptions::get()
            .header("Content-Type", "text/plain")
            .header("Authorization", "Basic xyz");
        let headers = api.build_headers(&options).unwrap();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Basic xyz");
    }

    #[test]
    fn test_auth_header_only_with_valid_token() {
        let api = client("http://localhost:9");
        api.tokens().set_token("abc", None, Some(0), false).unwrap();
        // Zero-second token: present but expired as soon as the clock ticks
        std::thread::sleep(Duration::from_millis(5));
        let headers = api.build_headers(&RequestOptions::get()).unwrap();
        assert!(headers.get(header::AUTHORIZATION).is_none());

        api.tokens().set_token("abc", None, None, false).unwrap();
        let headers = api.build_headers(&RequestOptions::get()).unwrap();
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer abc");
    }

    #[test]
    fn test_multipart_skips_json_content_type() {
        let api = client("http://localhost:9");
        let options = RequestOptions::with_method(reqwest::Method::POST).multipart(UploadFile {
            field: "file".to_string(),
            filename: "a.png".to_string(),
            mime: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        });
        let headers = api.build_headers(&options).unwrap();
        assert!(headers.get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_bad_header_name_is_invalid_request() {
        let api = client("http://localhost:9");
        let options = RequestOptions::get().header("bad header", "x");
        assert!(matches!(api.build_headers(&options), Err(ApiError::InvalidRequest(_))));
    }
}
