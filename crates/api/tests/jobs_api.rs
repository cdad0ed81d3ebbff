//! HTTP-level tests for job creation, the status endpoint and deletion.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_job, delete_with_token, get, get_with_token, post_json, run_to_completion,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_job_returns_201_with_credential(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/jobs",
        serde_json::json!({
            "email": "parent@example.test",
            "source_image_ref": "uploads/scan.jpg",
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["session_credential"].as_str().unwrap().len(), 48);
    assert!(json["data"]["expires_at"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_job_rejects_bad_email(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/jobs",
        serde_json::json!({ "email": "nope", "source_image_ref": "uploads/scan.jpg" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn status_of_new_job_is_pending(pool: PgPool) {
    let (job_id, token) = create_job(&pool).await;

    let app = common::build_test_app(pool);
    let response = get_with_token(app, &format!("/api/v1/jobs/{job_id}/status"), &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["job_id"], job_id.as_str());
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["progress"], 0);
    assert!(json["data"]["stage"].is_null());
    assert!(json["data"]["result_url"].is_null());
    assert!(json["data"]["original_url"]
        .as_str()
        .unwrap()
        .contains("uploads/scan.jpg"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn status_without_credential_is_session_expired(pool: PgPool) {
    let (job_id, _token) = create_job(&pool).await;

    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/jobs/{job_id}/status")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "SESSION_EXPIRED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wrong_credential_and_unknown_job_look_the_same(pool: PgPool) {
    let (job_id, token) = create_job(&pool).await;

    let app = common::build_test_app(pool.clone());
    let wrong = get_with_token(app, &format!("/api/v1/jobs/{job_id}/status"), "not-it").await;

    let unknown = uuid::Uuid::new_v4();
    let app = common::build_test_app(pool);
    let missing = get_with_token(app, &format!("/api/v1/jobs/{unknown}/status"), &token).await;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong).await, body_json(missing).await);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn completed_job_shows_preview_but_no_result_until_purchased(pool: PgPool) {
    let (job_id, token) = create_job(&pool).await;
    run_to_completion(&pool, &job_id).await;

    let app = common::build_test_app(pool);
    let response = get_with_token(app, &format!("/api/v1/jobs/{job_id}/status"), &token).await;
    let json = body_json(response).await;

    assert_eq!(json["data"]["status"], "completed");
    assert_eq!(json["data"]["stage"], "complete");
    assert_eq!(json["data"]["progress"], 100);
    assert!(json["data"]["preview_url"].is_string());
    assert!(json["data"]["result_id"].is_string());
    assert!(json["data"]["result_url"].is_null());
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_job_then_status_is_session_expired(pool: PgPool) {
    let (job_id, token) = create_job(&pool).await;

    let app = common::build_test_app(pool.clone());
    let response = delete_with_token(app, &format!("/api/v1/jobs/{job_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let app = common::build_test_app(pool);
    let response = get_with_token(app, &format!("/api/v1/jobs/{job_id}/status"), &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
