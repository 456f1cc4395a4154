//! Integration tests for the request pipeline
//!
//! Tests cover:
//! - Header construction against a live mock server
//! - Status classification and session clearing on 401
//! - Retry on connectivity failures only
//! - Timeouts
//! - GET caching and in-flight de-duplication

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use folio_core::api::error::TIMEOUT_DETAIL;
use folio_core::api::ErrorBody;
use folio_core::auth::MemoryTokenStore;
use folio_core::{ApiClient, ApiError, ApiResponse, CacheManager, Config, RequestOptions, TokenManager};

fn test_config(base_url: &str) -> Config {
    Config {
        api_url: Some(base_url.to_string()),
        retry_delay_ms: 10,
        ..Config::default()
    }
}

fn client(base_url: &str) -> ApiClient {
    let tokens = Arc::new(TokenManager::new(MemoryTokenStore::new()));
    ApiClient::new(&test_config(base_url), tokens, Arc::new(CacheManager::new()))
        .expect("Failed to build client")
}

/// A server that accepts connections and drops them without answering.
async fn dropping_server() -> (String, Arc<AtomicUsize>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(socket);
        }
    });
    (format!("http://{}", addr), accepted)
}

// ============================================================================
// Headers
// ============================================================================

mod headers {
    use super::*;

    #[tokio::test]
    async fn sends_bearer_token_when_valid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("authorization", "Bearer abc"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "username": "admin"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        api.tokens().set_token("abc", None, None, false).unwrap();
        let user: Value = api.get("/auth/me").await.unwrap();
        assert_eq!(user["username"], "admin");
    }

    #[tokio::test]
    async fn sends_query_params_and_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog/public"))
            .and(query_param("tag", "rust"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/blog/tags"))
            .and(body_json(json!({"name": "rust"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1, "name": "rust"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let posts: Vec<Value> = api.get_with("/blog/public", &[("tag", "rust")]).await.unwrap();
        assert!(posts.is_empty());
        let tag: Value = api.post("/blog/tags", &json!({"name": "rust"})).await.unwrap();
        assert_eq!(tag["id"], 1);
    }
}

// ============================================================================
// Status classification
// ============================================================================

mod classification {
    use super::*;

    #[tokio::test]
    async fn unauthorized_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Not authenticated"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        api.tokens().set_token("abc", None, None, true).unwrap();

        let err = api.get::<Value>("/auth/me").await.unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
        assert!(err.is_auth_expired());
        assert_eq!(api.tokens().token(), None);
        assert!(!api.tokens().is_remembered());
    }

    #[tokio::test]
    async fn failed_login_keeps_session_and_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Incorrect username or password"})),
            )
            .mount(&server)
            .await;

        let api = client(&server.uri());
        api.tokens().set_token("existing", None, None, false).unwrap();

        let options = RequestOptions::post(json!({"username": "a", "password": "b"})).skip_auth_check();
        let err = api.request("/auth/login", options).await.unwrap_err();
        assert_eq!(err.status(), 401);
        assert_eq!(err.detail(), "Incorrect username or password");
        assert_eq!(api.tokens().token().as_deref(), Some("existing"));
    }

    #[tokio::test]
    async fn skip_auth_check_keeps_session_elsewhere() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
            .mount(&server)
            .await;

        let api = client(&server.uri());
        api.tokens().set_token("abc", None, None, false).unwrap();

        let err = api
            .request("/blog/messages", RequestOptions::get().skip_auth_check())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Http { status: 401, detail: "nope".to_string() });
        assert!(api.tokens().has_valid_token());
    }

    #[tokio::test]
    async fn fixed_statuses_map_to_fixed_messages() {
        let server = MockServer::start().await;
        for (route, status) in [("/forbidden", 403), ("/missing", 404), ("/busy", 429), ("/broken", 502)] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(status).set_body_string("ignored"))
                .expect(1)
                .mount(&server)
                .await;
        }

        let api = client(&server.uri());
        api.tokens().set_token("abc", None, None, false).unwrap();

        assert_eq!(api.get::<Value>("/forbidden").await.unwrap_err(), ApiError::Forbidden);
        assert_eq!(api.get::<Value>("/missing").await.unwrap_err(), ApiError::NotFound);
        assert_eq!(api.get::<Value>("/busy").await.unwrap_err(), ApiError::RateLimited);
        assert_eq!(
            api.get::<Value>("/broken").await.unwrap_err(),
            ApiError::Server { status: 502 }
        );
        // 403 does not touch the session
        assert!(api.tokens().has_valid_token());
    }

    #[tokio::test]
    async fn other_errors_carry_body_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/blog/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "Title is required"})))
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let err = api.post::<Value, _>("/blog/", &json!({})).await.unwrap_err();
        assert_eq!(err.body(), ErrorBody { detail: "Title is required".to_string(), status: 400 });
    }

    #[tokio::test]
    async fn non_json_success_is_raw() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *"))
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let response = api.request("/robots.txt", RequestOptions::get()).await.unwrap();
        match response {
            ApiResponse::Raw { status, body, .. } => {
                assert_eq!(status, 200);
                assert_eq!(body, b"User-agent: *".to_vec());
            }
            other => panic!("expected raw response, got {:?}", other),
        }
        // Raw bodies are never cached
        assert!(api.cache().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_a_parse_error_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog/public"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{not json", "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let err = api.get::<Value>("/blog/public").await.unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)), "got {:?}", err);
    }
}

// ============================================================================
// Retry and timeout
// ============================================================================

mod resilience {
    use super::*;

    #[tokio::test]
    async fn network_failures_retry_exactly_max_retries() {
        let (base_url, accepted) = dropping_server().await;
        let api = client(&base_url);

        let err = api.get::<Value>("/blog/public").await.unwrap_err();
        match err {
            ApiError::Network(ref message) => assert!(!message.is_empty()),
            other => panic!("expected network error, got {:?}", other),
        }
        assert_eq!(err.status(), 0);
        // One attempt plus three retries
        assert_eq!(accepted.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn zero_retries_means_one_attempt() {
        let (base_url, accepted) = dropping_server().await;
        let config = Config {
            max_retries: 0,
            ..test_config(&base_url)
        };
        let tokens = Arc::new(TokenManager::new(MemoryTokenStore::new()));
        let api = ApiClient::new(&config, tokens, Arc::new(CacheManager::new())).unwrap();

        assert!(api.get::<Value>("/health").await.is_err());
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn server_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        assert_eq!(
            api.get::<Value>("/health").await.unwrap_err(),
            ApiError::Server { status: 500 }
        );
    }

    #[tokio::test]
    async fn timeout_surfaces_as_408_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true}))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let options = RequestOptions::get().timeout(Duration::from_millis(100));
        let err = api.request("/slow", options).await.unwrap_err();

        assert_eq!(err, ApiError::Timeout);
        assert_eq!(
            err.body(),
            ErrorBody {
                detail: TIMEOUT_DETAIL.to_string(),
                status: 408,
            }
        );
        assert_eq!(err.detail(), "請求超時，請檢查網路連線");
    }
}

// ============================================================================
// Caching
// ============================================================================

mod caching {
    use super::*;

    #[tokio::test]
    async fn repeated_get_is_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog/public"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "title": "Hello"}])))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let first: Vec<Value> = api.get("/blog/public").await.unwrap();
        let second: Vec<Value> = api.get("/blog/public").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second[0]["title"], "Hello");
    }

    #[tokio::test]
    async fn different_params_are_different_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog/public"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let _: Vec<Value> = api.get_with("/blog/public", &[("page", "1")]).await.unwrap();
        let _: Vec<Value> = api.get_with("/blog/public", &[("page", "2")]).await.unwrap();
        let _: Vec<Value> = api.get_with("/blog/public", &[("page", "1")]).await.unwrap();
    }

    #[tokio::test]
    async fn writes_bypass_and_do_not_invalidate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/blog/tags"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1, "name": "rust"})))
            .expect(2)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let _: Vec<Value> = api.get("/blog/tags").await.unwrap();
        let _: Value = api.post("/blog/tags", &json!({"name": "rust"})).await.unwrap();
        let _: Value = api.post("/blog/tags", &json!({"name": "rust"})).await.unwrap();

        // Still the pre-write answer until someone invalidates
        let tags: Vec<Value> = api.get("/blog/tags").await.unwrap();
        assert!(tags.is_empty());
        assert_eq!(api.invalidate("/blog/tags"), 1);
    }

    #[tokio::test]
    async fn no_cache_option_always_hits_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .expect(2)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let _: Value = api.get_fresh("/health").await.unwrap();
        let _: Value = api.get_fresh("/health").await.unwrap();
        assert!(api.cache().is_empty());
    }

    #[tokio::test]
    async fn concurrent_identical_gets_share_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog/portfolio/public"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": 7, "title": "Site"}]))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let (a, b, c) = tokio::join!(
            api.get::<Vec<Value>>("/blog/portfolio/public"),
            api.get::<Vec<Value>>("/blog/portfolio/public"),
            api.get::<Vec<Value>>("/blog/portfolio/public"),
        );
        assert_eq!(a.unwrap()[0]["id"], 7);
        assert_eq!(b.unwrap()[0]["id"], 7);
        assert_eq!(c.unwrap()[0]["id"], 7);
    }

    #[tokio::test]
    async fn failed_gets_are_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog/public"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        assert!(api.get::<Value>("/blog/public").await.is_err());
        assert!(api.get::<Value>("/blog/public").await.is_err());
        assert!(api.cache().is_empty());
    }

    #[tokio::test]
    async fn response_is_not_cached_after_mid_flight_clear() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": 1, "username": "previous"}))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let clear_midway = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            api.reset_session();
        };
        let (result, ()) = tokio::join!(api.get::<Value>("/auth/me"), clear_midway);

        // The caller still gets its answer, but the cache stays empty
        assert_eq!(result.unwrap()["username"], "previous");
        assert!(api.cache().is_empty());
    }

    #[tokio::test]
    async fn requests_after_reset_do_not_join_earlier_ones() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog/public"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let after_reset = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            api.reset_session();
            api.get::<Value>("/blog/public").await
        };
        let (first, second) = tokio::join!(api.get::<Value>("/blog/public"), after_reset);
        assert!(first.is_ok());
        assert!(second.is_ok());
        // Only the request issued after the reset was cached
        assert_eq!(api.cache().len(), 1);
    }
}
