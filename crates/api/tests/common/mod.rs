#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sonogen_core::credentials::{sign_callback_body, SIGNATURE_HEADER};
use sqlx::PgPool;
use tower::ServiceExt;

use sonogen_api::config::{ServerConfig, StorageConfig};
use sonogen_api::middleware::session::SESSION_HEADER;
use sonogen_api::router::build_app_router;
use sonogen_api::signer::HmacUrlSigner;
use sonogen_api::state::AppState;

/// Shared secret the test "worker" signs callbacks with.
pub const TEST_CALLBACK_SECRET: &str = "test-callback-secret";

/// Build a test `ServerConfig` with safe defaults.
///
/// Two variants per job keeps the lifecycle scenarios short.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        worker_callback_secret: TEST_CALLBACK_SECRET.to_string(),
        storage: StorageConfig {
            public_url: "http://storage.test/sonogen".to_string(),
            signing_secret: "test-storage-secret".to_string(),
            signed_url_ttl_secs: 600,
        },
        variant_count: 2,
        retention_days: 30,
        retention_sweep_secs: 3600,
    }
}

/// Build the full application router over `pool`, with the production
/// middleware stack.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        signer: Arc::new(HmacUrlSigner::new(&config.storage)),
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_with_token(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header(SESSION_HEADER, token)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_with_token(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header(SESSION_HEADER, token)
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// POST a callback body signed with [`TEST_CALLBACK_SECRET`].
pub async fn post_signed(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let raw = body.to_string();
    let signature = sign_callback_body(TEST_CALLBACK_SECRET, raw.as_bytes());
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(raw))
        .unwrap();
    send(app, request).await
}

pub async fn delete_with_token(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header(SESSION_HEADER, token)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Scenario helpers
// ---------------------------------------------------------------------------

/// Upload a job. Returns `(job_id, session_credential)`.
pub async fn create_job(pool: &PgPool) -> (String, String) {
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/jobs",
        serde_json::json!({
            "email": "parent@example.test",
            "source_image_ref": "uploads/scan.jpg",
            "prompt_version": "v3",
        }),
    )
    .await;
    let json = body_json(response).await;
    (
        json["data"]["id"].as_str().unwrap().to_string(),
        json["data"]["session_credential"].as_str().unwrap().to_string(),
    )
}

pub async fn reach_stage(pool: &PgPool, job_id: &str, stage: &str) -> Response {
    post_signed(
        build_test_app(pool.clone()),
        &format!("/api/v1/callbacks/jobs/{job_id}/stage"),
        serde_json::json!({ "stage": stage, "workflow_run_ref": "run-1" }),
    )
    .await
}

pub async fn complete_variant(pool: &PgPool, job_id: &str, index: i16) -> Response {
    post_signed(
        build_test_app(pool.clone()),
        &format!("/api/v1/callbacks/jobs/{job_id}/variants/{index}/completed"),
        serde_json::json!({
            "result_ref": format!("results/{job_id}/{index}.png"),
            "preview_ref": format!("previews/{job_id}/{index}.jpg"),
            "variant_descriptor": format!("style-{index}"),
            "file_size_bytes": 2048,
            "timing_ms": 1500,
            "workflow_run_ref": "run-1",
        }),
    )
    .await
}

pub async fn fail_variant(pool: &PgPool, job_id: &str, index: i16) -> Response {
    post_signed(
        build_test_app(pool.clone()),
        &format!("/api/v1/callbacks/jobs/{job_id}/variants/{index}/failed"),
        serde_json::json!({ "reason": "sampler diverged", "workflow_run_ref": "run-1" }),
    )
    .await
}

/// Drive a job through every stage with both variants succeeding.
pub async fn run_to_completion(pool: &PgPool, job_id: &str) {
    reach_stage(pool, job_id, "validating").await;
    reach_stage(pool, job_id, "generating").await;
    complete_variant(pool, job_id, 0).await;
    complete_variant(pool, job_id, 1).await;
    reach_stage(pool, job_id, "complete").await;
}

/// Start a purchase as the owner and mark it paid. Returns the purchase id.
pub async fn paid_purchase(
    pool: &PgPool,
    job_id: &str,
    token: &str,
    body: serde_json::Value,
) -> String {
    let response = post_json_with_token(
        build_test_app(pool.clone()),
        &format!("/api/v1/jobs/{job_id}/purchases"),
        token,
        body,
    )
    .await;
    let purchase_id = body_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    post_signed(
        build_test_app(pool.clone()),
        &format!("/api/v1/callbacks/purchases/{purchase_id}/completed"),
        serde_json::json!({}),
    )
    .await;
    purchase_id
}
