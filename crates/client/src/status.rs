//! Reads job snapshots from the status endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use sonogen_core::snapshot::JobSnapshot;
use sonogen_core::types::DbId;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Header carrying the session credential.
pub const SESSION_HEADER: &str = "x-session-token";

/// Anything that can answer "what is this job doing now".
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(
        &self,
        job_id: DbId,
        session_credential: &str,
    ) -> Result<JobSnapshot, ClientError>;
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// [`StatusSource`] over HTTP.
pub struct HttpStatusSource {
    client: reqwest::Client,
    api_base_url: String,
}

impl HttpStatusSource {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config.api_base_url.clone())
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_base_url: String) -> Self {
        Self {
            client,
            api_base_url,
        }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch_status(
        &self,
        job_id: DbId,
        session_credential: &str,
    ) -> Result<JobSnapshot, ClientError> {
        let response = self
            .client
            .get(format!("{}/api/v1/jobs/{job_id}/status", self.api_base_url))
            .header(SESSION_HEADER, session_credential)
            .send()
            .await?;

        let status = response.status();
        // The server answers 401 for both a bad credential and a missing
        // job; 404 still means the job is gone.
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND {
            return Err(ClientError::SessionExpired);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let envelope: DataEnvelope<JobSnapshot> = serde_json::from_slice(&bytes)?;
        Ok(envelope.data)
    }
}


#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::{Json, Router};
    use sonogen_core::status::JobStatus;
    use uuid::Uuid;

    use super::*;
    use crate::status::fake::snapshot;

    const STATUS_PATH: &str = "/api/v1/jobs/{id}/status";

    async fn serve(app: Router) -> HttpStatusSource {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        HttpStatusSource::with_client(reqwest::Client::new(), format!("http://{addr}"))
    }

    async fn snapshot_for_cred(
        Path(job_id): Path<DbId>,
        headers: HeaderMap,
    ) -> Result<Json<serde_json::Value>, StatusCode> {
        let credential = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok());
        if credential != Some("cred") {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(Json(serde_json::json!({ "data": snapshot(job_id, JobStatus::Processing) })))
    }

    // ---- success ----

    #[tokio::test]
    async fn decodes_enveloped_snapshot() {
        let source = serve(Router::new().route(STATUS_PATH, get(snapshot_for_cred))).await;
        let job_id = Uuid::new_v4();

        let snapshot = source.fetch_status(job_id, "cred").await.unwrap();

        assert_eq!(snapshot.job_id, job_id);
        assert_eq!(snapshot.status, JobStatus::Processing);
        assert_eq!(snapshot.progress, 10);
    }

    // ---- errors ----

    #[tokio::test]
    async fn wrong_credential_means_expired() {
        let source = serve(Router::new().route(STATUS_PATH, get(snapshot_for_cred))).await;

        let err = source.fetch_status(Uuid::new_v4(), "stale").await.unwrap_err();

        assert_matches!(err, ClientError::SessionExpired);
    }

    #[tokio::test]
    async fn not_found_means_expired() {
        let app = Router::new().route(STATUS_PATH, get(|| async { StatusCode::NOT_FOUND }));
        let source = serve(app).await;

        let err = source.fetch_status(Uuid::new_v4(), "cred").await.unwrap_err();

        assert_matches!(err, ClientError::SessionExpired);
    }

    #[tokio::test]
    async fn server_error_keeps_status_and_body() {
        let app = Router::new().route(
            STATUS_PATH,
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );
        let source = serve(app).await;

        let err = source.fetch_status(Uuid::new_v4(), "cred").await.unwrap_err();

        assert_matches!(err, ClientError::Api { status: 503, body } if body == "maintenance");
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let app = Router::new().route(STATUS_PATH, get(|| async { "{not json" }));
        let source = serve(app).await;

        let err = source.fetch_status(Uuid::new_v4(), "cred").await.unwrap_err();

        assert_matches!(err, ClientError::Decode(_));
    }

    #[tokio::test]
    async fn unreachable_server_is_http_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let source = HttpStatusSource::with_client(reqwest::Client::new(), format!("http://{addr}"));

        let err = source.fetch_status(Uuid::new_v4(), "cred").await.unwrap_err();

        assert_matches!(err, ClientError::Http(_));
    }
}
