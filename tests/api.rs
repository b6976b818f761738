use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::Utc;
use product_service::{
    AppState,
    cache::keys::product_key,
    config::Config,
    router::create_router,
    store::{CacheStore, MemoryProductStore, MemoryStore},
    utils::{Claims, TokenVerifier},
};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "integration_test_secret";

struct TestApp {
    router: Router,
    records: Arc<MemoryProductStore>,
    redis: Arc<MemoryStore>,
    verifier: TokenVerifier,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

fn config() -> Config {
    Config {
        database_url: String::new(),
        redis_url: String::new(),
        jwt_secret: SECRET.into(),
        server_host: "127.0.0.1".into(),
        server_port: 0,
        api_base_uri: "/api".into(),
        rate_limit_window_secs: 60,
        rate_limit_requests: 100,
        product_cache_ttl_secs: 3600,
        store_timeout_ms: 1000,
        database_max_connections: 1,
    }
}

impl TestApp {
    fn new() -> Self {
        let records = Arc::new(MemoryProductStore::new());
        let redis = Arc::new(MemoryStore::new());
        let state = AppState::new(config(), records.clone(), redis.clone(), redis.clone());

        Self {
            router: create_router(state),
            records,
            redis,
            verifier: TokenVerifier::new(SECRET),
        }
    }

    fn token(&self) -> String {
        self.verifier
            .issue("alice@example.com", "ROLE_USER", Duration::from_secs(3600))
            .unwrap()
    }

    async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn get(&self, uri: &str) -> TestResponse {
        self.send(
            Request::builder()
                .uri(uri)
                .header("x-real-ip", "1.2.3.4")
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn write(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-real-ip", "1.2.3.4");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    async fn create_widget(&self) -> Value {
        let token = self.token();
        let response = self
            .write(
                Method::POST,
                "/api/products",
                Some(&token),
                Some(json!({"name": "Widget", "price": 9.99, "stock": 10, "category": "tools"})),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.body
    }
}

#[tokio::test]
async fn test_widget_create_then_read_hits_cache() {
    let app = TestApp::new();

    let created = app.create_widget().await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["name"], "Widget");
    assert_eq!(created["description"], "");
    assert_eq!(created["price"], 9.99);
    assert_eq!(created["stock"], 10);
    assert_eq!(created["category"], "tools");
    assert!(created["created_at"].is_string());
    assert_eq!(created["created_at"], created["updated_at"]);

    let first = app.get(&format!("/api/products/{}", id)).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body, created);

    let second = app.get(&format!("/api/products/{}", id)).await;
    assert_eq!(second.body, created);
    assert_eq!(app.records.read_count(), 0);
}

#[tokio::test]
async fn test_read_miss_populates_cache_once() {
    let app = TestApp::new();
    let created = app.create_widget().await;
    let id = created["id"].as_i64().unwrap();
    app.redis.delete(&product_key(id)).await.unwrap();

    app.get(&format!("/api/products/{}", id)).await;
    assert_eq!(app.records.read_count(), 1);

    let again = app.get(&format!("/api/products/{}", id)).await;
    assert_eq!(again.body, created);
    assert_eq!(app.records.read_count(), 1);
}

#[tokio::test]
async fn test_update_is_visible_on_next_read() {
    let app = TestApp::new();
    let token = app.token();
    let created = app.create_widget().await;
    let uri = format!("/api/products/{}", created["id"]);

    // 旧快照已在缓存中
    app.get(&uri).await;

    let updated = app
        .write(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({"price": 12.5, "stock": 3})),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["name"], "Widget");
    assert_eq!(updated.body["price"], 12.5);
    assert_eq!(updated.body["stock"], 3);

    let fetched = app.get(&uri).await;
    assert_eq!(fetched.body, updated.body);
}

#[tokio::test]
async fn test_delete_then_read_is_not_found() {
    let app = TestApp::new();
    let token = app.token();
    let created = app.create_widget().await;
    let uri = format!("/api/products/{}", created["id"]);
    app.get(&uri).await;

    let deleted = app.write(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Product deleted successfully");

    let fetched = app.get(&uri).await;
    assert_eq!(fetched.status, StatusCode::NOT_FOUND);
    assert_eq!(fetched.body["code"], 404);
    assert_eq!(fetched.body["error_message"], "Product not found");

    let again = app.write(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_missing_product() {
    let app = TestApp::new();
    let token = app.token();
    let response = app
        .write(
            Method::PUT,
            "/api/products/999",
            Some(&token),
            Some(json!({"stock": 1})),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_writes_require_token() {
    let app = TestApp::new();
    let body = json!({"name": "Widget", "price": 9.99, "category": "tools"});

    let missing = app
        .write(Method::POST, "/api/products", None, Some(body.clone()))
        .await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["error_message"], "Authorization header required");

    let garbage = app
        .write(Method::POST, "/api/products", Some("garbage"), Some(body.clone()))
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.body["error_message"], "Invalid token");

    let foreign = TokenVerifier::new("some_other_secret")
        .issue("mallory", "ROLE_ADMIN", Duration::from_secs(3600))
        .unwrap();
    let forged = app
        .write(Method::POST, "/api/products", Some(&foreign), Some(body.clone()))
        .await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    let now = Utc::now().timestamp();
    let expired = app
        .verifier
        .sign(&Claims {
            sub: "alice@example.com".into(),
            role: "ROLE_USER".into(),
            iss: None,
            iat: Some(now - 7200),
            exp: Some(now - 60),
        })
        .unwrap();
    let stale = app
        .write(Method::POST, "/api/products", Some(&expired), Some(body))
        .await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);

    let listed = app.get("/api/products").await;
    assert_eq!(listed.body, json!([]));
}

#[tokio::test]
async fn test_reads_are_public() {
    let app = TestApp::new();
    app.create_widget().await;

    let listed = app.get("/api/products").await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_filters_by_category() {
    let app = TestApp::new();
    let token = app.token();
    app.create_widget().await;
    app.write(
        Method::POST,
        "/api/products",
        Some(&token),
        Some(json!({"name": "Apple", "price": 0.5, "category": "food"})),
    )
    .await;

    let food = app.get("/api/products?category=food").await;
    let items = food.body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Apple");
    assert_eq!(items[0]["stock"], 0);

    let all = app.get("/api/products?category=").await;
    assert_eq!(all.body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_validation_errors_are_bad_requests() {
    let app = TestApp::new();
    let token = app.token();

    let invalid = app
        .write(
            Method::POST,
            "/api/products",
            Some(&token),
            Some(json!({"name": "", "price": -1, "category": "tools"})),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.body["code"], 400);

    let missing_field = app
        .write(
            Method::POST,
            "/api/products",
            Some(&token),
            Some(json!({"name": "Widget", "category": "tools"})),
        )
        .await;
    assert_eq!(missing_field.status, StatusCode::BAD_REQUEST);

    let bad_id = app.get("/api/products/abc").await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);

    let negative_stock = app
        .write(
            Method::PUT,
            "/api/products/1",
            Some(&token),
            Some(json!({"stock": -1})),
        )
        .await;
    assert_eq!(negative_stock.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rate_limit_headers_and_rejection() {
    let app = TestApp::new();

    for expected in (0..100).rev() {
        let response = app.get("/health").await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers["x-ratelimit-limit"], "100");
        assert_eq!(
            response.headers["x-ratelimit-remaining"],
            expected.to_string().as_str()
        );
    }

    let rejected = app.get("/health").await;
    assert_eq!(rejected.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(rejected.body["error_message"], "Rate limit exceeded");
    assert_eq!(rejected.headers["x-ratelimit-limit"], "100");
    assert_eq!(rejected.headers["x-ratelimit-remaining"], "0");
}

#[tokio::test]
async fn test_rate_limit_runs_before_auth() {
    let app = TestApp::new();
    for _ in 0..100 {
        app.get("/api/products").await;
    }

    // 即使没有令牌，也先被限流拒绝
    let response = app
        .write(
            Method::POST,
            "/api/products",
            None,
            Some(json!({"name": "Widget", "price": 1, "category": "tools"})),
        )
        .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_counter_store_outage_fails_closed() {
    let app = TestApp::new();
    app.redis.set_unavailable(true);

    let response = app.get("/api/products").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["error_message"], "Rate limit check failed");
    assert!(response.headers.get("x-ratelimit-remaining").is_none());
}

#[tokio::test]
async fn test_record_store_outage_is_internal_error() {
    let app = TestApp::new();
    app.records.set_unavailable(true);

    let response = app.get("/api/products").await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["error_message"], "Failed to list products");
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["service"], "product-service");
}
