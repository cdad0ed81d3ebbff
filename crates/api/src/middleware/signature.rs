//! HMAC-authenticated JSON body extractor for worker and payment callbacks.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use sonogen_core::credentials::{verify_callback_signature, SIGNATURE_HEADER};
use sonogen_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// A JSON body whose `x-signature` header is the hex HMAC-SHA256 of the raw
/// bytes under `WORKER_CALLBACK_SECRET`.
///
/// The signature is checked before the body is parsed.
#[derive(Debug)]
pub struct SignedJson<T>(pub T);

impl<T> FromRequest<AppState> for SignedJson<T>
where
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let signature = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Missing callback signature".into()))
            })?;

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        if !verify_callback_signature(&state.config.worker_callback_secret, &body, &signature) {
            tracing::warn!("Rejected callback with invalid signature");
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid callback signature".into(),
            )));
        }

        let value = serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid callback payload: {e}")))?;
        Ok(SignedJson(value))
    }
}
