//! Polls the status endpoint until a job reaches a terminal status.
//!
//! There is no overall deadline: the poller keeps going until the job
//! completes or fails, the session expires, or it is cancelled. The delay
//! doubles while nothing changes and resets when the job moves.

use std::time::Duration;

use sonogen_core::snapshot::JobSnapshot;
use sonogen_core::types::DbId;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::SessionStore;
use crate::status::StatusSource;

/// How a polling run ended.
#[derive(Debug)]
pub enum PollOutcome {
    /// The job completed or failed.
    Terminal(JobSnapshot),
    /// The server no longer recognizes the session; the record was cleared.
    Expired,
    Cancelled,
}

pub struct StatusPoller<S> {
    source: S,
    store: SessionStore,
    poll_interval: Duration,
    max_poll_interval: Duration,
}

/// Double `current`, capped at `max`.
pub fn next_delay(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

impl<S: StatusSource> StatusPoller<S> {
    pub fn new(source: S, store: SessionStore, config: &ClientConfig) -> Self {
        Self {
            source,
            store,
            poll_interval: config.poll_interval,
            max_poll_interval: config.max_poll_interval.max(config.poll_interval),
        }
    }

    /// Poll `job_id` until it is terminal or `cancel` fires.
    pub async fn run(
        &self,
        job_id: DbId,
        session_credential: &str,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let mut delay = self.poll_interval;
        let mut last_seen: Option<JobSnapshot> = None;

        loop {
            if cancel.is_cancelled() {
                return PollOutcome::Cancelled;
            }

            match self.source.fetch_status(job_id, session_credential).await {
                Ok(snapshot) => {
                    if let Err(e) = self
                        .store
                        .update_status(job_id, snapshot.status, snapshot.result_id)
                        .await
                    {
                        tracing::warn!(
                            job_id = %job_id,
                            error = %e,
                            "Could not update session record",
                        );
                    }

                    if snapshot.is_terminal() {
                        tracing::info!(
                            job_id = %job_id,
                            status = %snapshot.status,
                            "Job reached terminal status",
                        );
                        return PollOutcome::Terminal(snapshot);
                    }

                    let moved = last_seen.as_ref().map_or(true, |prev| {
                        prev.stage != snapshot.stage || prev.progress != snapshot.progress
                    });
                    delay = if moved {
                        self.poll_interval
                    } else {
                        next_delay(delay, self.max_poll_interval)
                    };
                    tracing::debug!(
                        job_id = %job_id,
                        progress = snapshot.progress,
                        next_poll_ms = delay.as_millis() as u64,
                        "Job still running",
                    );
                    last_seen = Some(snapshot);
                }
                Err(ClientError::SessionExpired) => {
                    tracing::info!(job_id = %job_id, "Session expired while polling");
                    if let Err(e) = self.store.clear(job_id).await {
                        tracing::warn!(job_id = %job_id, error = %e, "Could not clear session record");
                    }
                    return PollOutcome::Expired;
                }
                Err(e) => {
                    delay = next_delay(delay, self.max_poll_interval);
                    tracing::warn!(
                        job_id = %job_id,
                        error = %e,
                        retry_ms = delay.as_millis() as u64,
                        "Status poll failed",
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use sonogen_core::status::JobStatus;
    use uuid::Uuid;

    use super::*;
    use crate::status::fake::ScriptedSource;

    fn fast_config() -> ClientConfig {
        ClientConfig {
            api_base_url: "http://unused".into(),
            poll_interval: Duration::from_millis(1),
            max_poll_interval: Duration::from_millis(4),
        }
    }

    #[test]
    fn delay_doubles_up_to_cap() {
        let max = Duration::from_secs(30);
        assert_eq!(next_delay(Duration::from_secs(2), max), Duration::from_secs(4));
        assert_eq!(next_delay(Duration::from_secs(20), max), max);
        assert_eq!(next_delay(max, max), max);
    }

    #[tokio::test]
    async fn polls_until_completed_and_records_status() {
        let store = SessionStore::in_memory();
        let job_id = Uuid::new_v4();
        store.start(job_id, "c".into(), JobStatus::Pending).await.unwrap();
        let source = ScriptedSource::new(vec![
            Ok(JobStatus::Pending),
            Ok(JobStatus::Processing),
            Ok(JobStatus::Completed),
        ]);
        let poller = StatusPoller::new(source, store.clone(), &fast_config());

        let outcome = poller.run(job_id, "c", &CancellationToken::new()).await;

        assert_matches!(outcome, PollOutcome::Terminal(s) if s.status == JobStatus::Completed);
        assert_eq!(poller.source.calls(), 3);
        let record = store.load(job_id).await.unwrap().unwrap();
        assert_eq!(record.last_known_status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let store = SessionStore::in_memory();
        let job_id = Uuid::new_v4();
        let source = ScriptedSource::new(vec![
            Err(ClientError::Api {
                status: 502,
                body: "bad gateway".into(),
            }),
            Ok(JobStatus::Failed),
        ]);
        let poller = StatusPoller::new(source, store, &fast_config());

        let outcome = poller.run(job_id, "c", &CancellationToken::new()).await;

        assert_matches!(outcome, PollOutcome::Terminal(s) if s.status == JobStatus::Failed);
    }

    #[tokio::test]
    async fn expired_session_clears_record() {
        let store = SessionStore::in_memory();
        let job_id = Uuid::new_v4();
        store.start(job_id, "c".into(), JobStatus::Processing).await.unwrap();
        let source = ScriptedSource::new(vec![Err(ClientError::SessionExpired)]);
        let poller = StatusPoller::new(source, store.clone(), &fast_config());

        let outcome = poller.run(job_id, "c", &CancellationToken::new()).await;

        assert_matches!(outcome, PollOutcome::Expired);
        assert!(store.load(job_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancellation_stops_polling() {
        let source = ScriptedSource::new(vec![Ok(JobStatus::Processing)]);
        let poller = StatusPoller::new(source, SessionStore::in_memory(), &fast_config());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = poller.run(Uuid::new_v4(), "c", &cancel).await;

        assert_matches!(outcome, PollOutcome::Cancelled);
        assert_eq!(poller.source.calls(), 0);
    }
}
