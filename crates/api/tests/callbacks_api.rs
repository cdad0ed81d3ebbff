//! HTTP-level tests for signed worker callbacks driving the stage engine.

mod common;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, StatusCode};
use common::{
    body_json, complete_variant, create_job, fail_variant, get_with_token, post_signed,
    reach_stage, run_to_completion,
};
use sqlx::PgPool;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Signature checks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn unsigned_callback_is_rejected(pool: PgPool) {
    let (job_id, _) = create_job(&pool).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/callbacks/jobs/{job_id}/stage"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"stage":"validating"}"#))
        .unwrap();
    let response = common::build_test_app(pool).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn tampered_callback_is_rejected(pool: PgPool) {
    let (job_id, _) = create_job(&pool).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/callbacks/jobs/{job_id}/stage"))
        .header(CONTENT_TYPE, "application/json")
        .header("x-signature", "00".repeat(32))
        .body(Body::from(r#"{"stage":"validating"}"#))
        .unwrap();
    let response = common::build_test_app(pool).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn first_variant_makes_job_viewable(pool: PgPool) {
    let (job_id, token) = create_job(&pool).await;

    let response = reach_stage(&pool, &job_id, "validating").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["applied"], true);
    assert_eq!(json["data"]["status"], "processing");

    reach_stage(&pool, &job_id, "generating").await;
    let response = complete_variant(&pool, &job_id, 1).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["stage"], "first_ready");

    let app = common::build_test_app(pool);
    let response = get_with_token(app, &format!("/api/v1/jobs/{job_id}/status"), &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "processing");
    assert!(json["data"]["preview_url"].is_string());
    assert!(json["data"]["result_id"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn redelivered_callback_is_acknowledged_without_change(pool: PgPool) {
    let (job_id, _) = create_job(&pool).await;
    reach_stage(&pool, &job_id, "validating").await;
    reach_stage(&pool, &job_id, "generating").await;
    complete_variant(&pool, &job_id, 0).await;

    let response = complete_variant(&pool, &job_id, 0).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["applied"], false);
    assert_eq!(json["data"]["stage"], "first_ready");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn redelivered_earlier_stage_after_completion_is_acknowledged(pool: PgPool) {
    let (job_id, _) = create_job(&pool).await;
    run_to_completion(&pool, &job_id).await;

    let response = reach_stage(&pool, &job_id, "generating").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["applied"], false);
    assert_eq!(json["data"]["stage"], "complete");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn skipping_a_stage_is_an_invalid_transition(pool: PgPool) {
    let (job_id, _) = create_job(&pool).await;

    let response = reach_stage(&pool, &job_id, "generating").await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVALID_TRANSITION");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn completing_with_outstanding_variants_is_rejected(pool: PgPool) {
    let (job_id, _) = create_job(&pool).await;
    reach_stage(&pool, &job_id, "validating").await;
    reach_stage(&pool, &job_id, "generating").await;
    complete_variant(&pool, &job_id, 0).await;

    let response = reach_stage(&pool, &job_id, "complete").await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "VARIANTS_OUTSTANDING");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn partial_failure_still_completes(pool: PgPool) {
    let (job_id, token) = create_job(&pool).await;
    reach_stage(&pool, &job_id, "validating").await;
    reach_stage(&pool, &job_id, "generating").await;
    fail_variant(&pool, &job_id, 0).await;
    complete_variant(&pool, &job_id, 1).await;

    let response = reach_stage(&pool, &job_id, "complete").await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool);
    let response = get_with_token(app, &format!("/api/v1/jobs/{job_id}/results"), &token).await;
    let json = body_json(response).await;
    let results = json["data"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["variant_index"], 1);
    assert_eq!(results[0]["is_primary"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn all_variants_failing_fails_the_job(pool: PgPool) {
    let (job_id, token) = create_job(&pool).await;
    reach_stage(&pool, &job_id, "validating").await;
    reach_stage(&pool, &job_id, "generating").await;
    fail_variant(&pool, &job_id, 0).await;
    let response = fail_variant(&pool, &job_id, 1).await;

    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "failed");

    let app = common::build_test_app(pool);
    let response = get_with_token(app, &format!("/api/v1/jobs/{job_id}/status"), &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["stage"], "failed");
    assert_eq!(json["data"]["error_message"], "All 2 variants failed");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn callback_from_a_stale_run_is_rejected(pool: PgPool) {
    let (job_id, _) = create_job(&pool).await;
    reach_stage(&pool, &job_id, "validating").await;

    let response = post_signed(
        common::build_test_app(pool),
        &format!("/api/v1/callbacks/jobs/{job_id}/stage"),
        serde_json::json!({ "stage": "generating", "workflow_run_ref": "run-0" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "STALE_RUN");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn job_failure_is_terminal(pool: PgPool) {
    let (job_id, _) = create_job(&pool).await;
    reach_stage(&pool, &job_id, "validating").await;

    let response = post_signed(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/callbacks/jobs/{job_id}/failure"),
        serde_json::json!({ "reason": "No face detected in scan" }),
    )
    .await;
    assert_eq!(body_json(response).await["data"]["status"], "failed");

    let response = reach_stage(&pool, &job_id, "generating").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn callback_for_unknown_job_is_404(pool: PgPool) {
    let unknown = uuid::Uuid::new_v4().to_string();

    let response = reach_stage(&pool, &unknown, "validating").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
