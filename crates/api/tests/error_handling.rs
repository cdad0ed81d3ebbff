//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server or
//! database is involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use sonogen_api::error::AppError;
use sonogen_core::error::{CoreError, SESSION_EXPIRED_MESSAGE};
use sonogen_core::stage::StageError;
use sonogen_core::status::JobStage;
use uuid::Uuid;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Test: CoreError::NotFound maps to 404 with NOT_FOUND code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_error_returns_404() {
    let id = Uuid::nil();
    let err = AppError::Core(CoreError::NotFound { entity: "Job", id });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], format!("Job with id {id} not found"));
}

// ---------------------------------------------------------------------------
// Test: SessionExpired maps to 401 with the fixed user-facing message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn session_expired_returns_401() {
    let (status, json) = error_to_response(AppError::Core(CoreError::SessionExpired)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "SESSION_EXPIRED");
    assert_eq!(json["error"], SESSION_EXPIRED_MESSAGE);
}

// ---------------------------------------------------------------------------
// Test: Validation and Conflict
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("email is required".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "email is required");
}

#[tokio::test]
async fn conflict_error_returns_409() {
    let err = AppError::Core(CoreError::Conflict("already recorded".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

// ---------------------------------------------------------------------------
// Test: Stage engine rejections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_transition_returns_409() {
    let err = AppError::Stage(StageError::InvalidTransition {
        from: Some(JobStage::Complete),
        requested: "generating".into(),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn stale_run_returns_409() {
    let err = AppError::Stage(StageError::StaleRun {
        bound: "run-1".into(),
        presented: "run-0".into(),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "STALE_RUN");
}

#[tokio::test]
async fn unknown_variant_returns_400() {
    let err = AppError::Stage(StageError::UnknownVariant { index: 9, count: 4 });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "UNKNOWN_VARIANT");
}

// ---------------------------------------------------------------------------
// Test: Locked variant maps to 403
// ---------------------------------------------------------------------------

#[tokio::test]
async fn locked_variant_returns_403() {
    let (status, json) = error_to_response(AppError::Locked(2)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "LOCKED");
}

// ---------------------------------------------------------------------------
// Test: Internal errors never leak their message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn internal_error_is_sanitized() {
    let err = AppError::Core(CoreError::Internal("stage 'queued' has no status".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn row_not_found_maps_to_404() {
    let (status, json) = error_to_response(AppError::Database(sqlx::Error::RowNotFound)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}
