//! Shared harness for the integration tests
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use shipyard::app::options::{AppOptions, AuthOptions, IngestOptions, StoreOptions, WebhookOptions};
use shipyard::app::state::AppState;
use shipyard::http::client::API_KEY_HEADER;
use shipyard::server::{router, ServerState};
use shipyard::store::{MemoryStore, Store};
use shipyard::webhooks::{compute_signature, format_signature_header};

pub const API_KEY: &str = "test-api-key";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const CDN_SECRET: &str = "cdn-secret-access-key";

pub struct TestApp {
    pub store: MemoryStore,
    pub state: Arc<AppState>,
    pub router: Router,
    pub ingest: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let ingest = tempfile::tempdir().unwrap();
        let options = AppOptions {
            store: StoreOptions::Memory,
            ingest: IngestOptions {
                base_dir: ingest.path().to_path_buf(),
            },
            auth: AuthOptions {
                api_key: Some(SecretString::from(API_KEY)),
            },
            webhook: WebhookOptions {
                secret: Some(SecretString::from(WEBHOOK_SECRET)),
                max_skew: None,
            },
            ..Default::default()
        };

        let store = MemoryStore::new();
        let shared: Arc<dyn Store> = Arc::new(store.clone());
        let state = Arc::new(AppState::with_store(shared, &options));
        let router = router(Arc::new(ServerState::new(&state)));

        Self {
            store,
            state,
            router,
            ingest,
        }
    }

    /// Create a build directory under the ingest base
    pub fn build_dir(&self, name: &str) {
        std::fs::create_dir_all(self.ingest.path().join(name)).unwrap();
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    /// Authenticated JSON request
    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(api_request(method, uri, body)).await
    }

    pub async fn add_steam_channel(&self, label: &str, app_id: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/channels/steam",
                Some(json!({
                    "label": label,
                    "appId": app_id,
                    "branch": "beta",
                    "depots": [{"id": "1001", "path": "Windows"}],
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["channel"].clone()
    }

    pub async fn add_cdn_channel(&self, label: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/channels/cdn",
                Some(json!({
                    "label": label,
                    "bucketName": "builds",
                    "region": "us-east-1",
                    "accessKeyId": "AKIATEST",
                    "secretAccessKey": CDN_SECRET,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["channel"].clone()
    }
}

pub fn api_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(API_KEY_HEADER, API_KEY);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Webhook delivery signed with `secret`
pub fn signed_webhook(payload: &Value, secret: &str) -> Request<Body> {
    let body = payload.to_string();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = compute_signature(&timestamp, body.as_bytes(), secret.as_bytes()).unwrap();

    Request::builder()
        .method(Method::POST)
        .uri("/api/webhooks/build")
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::AUTHORIZATION,
            format_signature_header("Signature", &timestamp, &signature),
        )
        .body(Body::from(body))
        .unwrap()
}
