use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sonogen_core::error::{CoreError, SESSION_EXPIRED_MESSAGE};
use sonogen_core::stage::StageError;
use sonogen_core::types::VariantIndex;
use sonogen_db::StageApplyError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`StageError`] for rejected
/// worker callbacks, and adds HTTP-specific variants. Implements
/// [`IntoResponse`] to produce consistent `{ "error", "code" }` bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A worker callback the stage engine refused.
    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The variant exists but has not been purchased.
    #[error("Variant {0} is locked")]
    Locked(VariantIndex),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<StageApplyError> for AppError {
    fn from(err: StageApplyError) -> Self {
        match err {
            StageApplyError::JobNotFound(id) => {
                AppError::Core(CoreError::NotFound { entity: "Job", id })
            }
            StageApplyError::Stage(e) => AppError::Stage(e),
            StageApplyError::Core(e) => AppError::Core(e),
            StageApplyError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::SessionExpired => (
                    StatusCode::UNAUTHORIZED,
                    "SESSION_EXPIRED",
                    SESSION_EXPIRED_MESSAGE.to_string(),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Stage engine rejections ---
            AppError::Stage(stage) => {
                let code = match stage {
                    StageError::InvalidTransition { .. } => "INVALID_TRANSITION",
                    StageError::StaleRun { .. } => "STALE_RUN",
                    StageError::VariantsOutstanding { .. } => "VARIANTS_OUTSTANDING",
                    StageError::UnknownVariant { .. } => "UNKNOWN_VARIANT",
                };
                let status = match stage {
                    StageError::UnknownVariant { .. } => StatusCode::BAD_REQUEST,
                    _ => StatusCode::CONFLICT,
                };
                (status, code, stage.to_string())
            }

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::Locked(index) => (
                StatusCode::FORBIDDEN,
                "LOCKED",
                format!("Variant {index} is locked. Purchase it to download the full-resolution image."),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
