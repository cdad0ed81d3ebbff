//! Reconciles a stored session with the server when the user comes back.
//!
//! A controller lives for one mount of the app. It checks the active
//! session record against the status endpoint and then either redirects
//! to the finished result, offers a resume prompt, or forgets the record.
//!
//! Every user action and the automatic redirect fire at most once per
//! mount. A status response is dropped if, by the time it arrives, the
//! user has acted, navigated, or dismissed the prompt, or the active
//! session record no longer points at the job it was asked about.

use sonogen_core::snapshot::JobSnapshot;
use sonogen_core::status::JobStatus;
use sonogen_core::types::DbId;
use tokio::sync::Mutex;

use crate::error::ClientError;
use crate::session::{SessionRecord, SessionStore};
use crate::status::StatusSource;

/// Where the user is, or is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Processing(DbId),
    Result(DbId),
}

impl Route {
    fn is_for(&self, job_id: DbId) -> bool {
        matches!(self, Route::Processing(id) | Route::Result(id) if *id == job_id)
    }
}

/// Performs navigation on behalf of the controller.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryState {
    NoSession,
    Checking,
    /// Offer resume / start fresh / dismiss for this job.
    ShowPrompt { job_id: DbId, status: JobStatus },
    Dismissed,
    Resumed,
}

#[derive(Debug)]
struct Inner {
    state: RecoveryState,
    /// An action or redirect has happened; nothing else may.
    resolved: bool,
    dismissed: bool,
    in_flight: bool,
    /// Bumped on navigation and dismissal; a check only applies if it is
    /// unchanged when the answer comes back.
    generation: u64,
}

/// What to do once the lock is released.
enum Effect {
    None,
    Navigate(Route),
    Clear(DbId),
    NavigateAndClear(Route, DbId),
}

pub struct RecoveryController<S, N> {
    store: SessionStore,
    source: S,
    navigator: N,
    inner: Mutex<Inner>,
}

impl<S: StatusSource, N: Navigator> RecoveryController<S, N> {
    pub fn new(store: SessionStore, source: S, navigator: N) -> Self {
        Self {
            store,
            source,
            navigator,
            inner: Mutex::new(Inner {
                state: RecoveryState::NoSession,
                resolved: false,
                dismissed: false,
                in_flight: false,
                generation: 0,
            }),
        }
    }

    pub async fn state(&self) -> RecoveryState {
        self.inner.lock().await.state.clone()
    }

    /// Run once when the app mounts on `current`.
    pub async fn on_mount(&self, current: Route) -> RecoveryState {
        let Some(record) = self.active_record().await else {
            return self.state().await;
        };
        if current.is_for(record.job_id) {
            // Already where the session would send us.
            return self.state().await;
        }
        self.check(record, false).await
    }

    /// Run when the page regains foreground visibility. Redirects if the job
    /// finished meanwhile; never re-shows a dismissed prompt.
    pub async fn on_visible(&self, current: Route) -> RecoveryState {
        if self.inner.lock().await.resolved {
            return self.state().await;
        }
        let Some(record) = self.active_record().await else {
            return self.state().await;
        };
        if current.is_for(record.job_id) {
            return self.state().await;
        }
        self.check(record, true).await
    }

    /// Continue watching the job. Returns whether navigation happened.
    pub async fn resume(&self) -> bool {
        let job_id = {
            let mut inner = self.inner.lock().await;
            let RecoveryState::ShowPrompt { job_id, .. } = inner.state else {
                return false;
            };
            if inner.resolved {
                return false;
            }
            inner.resolved = true;
            inner.state = RecoveryState::Resumed;
            job_id
        };
        tracing::info!(job_id = %job_id, "Resuming stored session");
        self.navigator.navigate(Route::Processing(job_id));
        true
    }

    /// Forget the stored session. Returns whether it was cleared.
    pub async fn start_fresh(&self) -> bool {
        let job_id = {
            let mut inner = self.inner.lock().await;
            let RecoveryState::ShowPrompt { job_id, .. } = inner.state else {
                return false;
            };
            if inner.resolved {
                return false;
            }
            inner.resolved = true;
            inner.state = RecoveryState::NoSession;
            job_id
        };
        tracing::info!(job_id = %job_id, "Starting fresh, discarding stored session");
        self.clear(job_id).await;
        true
    }

    /// Hide the prompt for the rest of this mount. The record is kept.
    pub async fn dismiss(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.resolved || !matches!(inner.state, RecoveryState::ShowPrompt { .. }) {
            return false;
        }
        inner.dismissed = true;
        inner.generation += 1;
        inner.state = RecoveryState::Dismissed;
        true
    }

    /// The user moved to `route` on their own. Any check still in flight
    /// is answered into the void.
    pub async fn on_navigate(&self, route: Route) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        tracing::debug!(?route, generation = inner.generation, "Navigation observed");
    }

    // ---- private helpers ----

    /// A storage failure is treated as "no session"; it never blocks the
    /// user.
    async fn active_record(&self) -> Option<SessionRecord> {
        match self.store.active().await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read session record");
                None
            }
        }
    }

    async fn check(&self, record: SessionRecord, silent: bool) -> RecoveryState {
        let generation = {
            let mut inner = self.inner.lock().await;
            if inner.resolved || inner.in_flight {
                return inner.state.clone();
            }
            inner.in_flight = true;
            if !silent {
                inner.state = RecoveryState::Checking;
            }
            inner.generation
        };

        let answer = self
            .source
            .fetch_status(record.job_id, &record.session_credential)
            .await;

        // The record may have been cleared or replaced by a new upload
        // while the request was out.
        let still_active = self
            .active_record()
            .await
            .is_some_and(|active| active.job_id == record.job_id);

        let (state, effect) = {
            let mut inner = self.inner.lock().await;
            inner.in_flight = false;
            if inner.resolved || inner.generation != generation || !still_active {
                tracing::debug!(job_id = %record.job_id, "Ignoring stale status response");
                if !silent && inner.state == RecoveryState::Checking {
                    inner.state = RecoveryState::NoSession;
                }
                return inner.state.clone();
            }
            let effect = Self::decide(&mut inner, record.job_id, answer.as_ref());
            (inner.state.clone(), effect)
        };

        if let Ok(snapshot) = &answer {
            if !matches!(effect, Effect::Clear(_) | Effect::NavigateAndClear(..)) {
                if let Err(e) = self
                    .store
                    .update_status(snapshot.job_id, snapshot.status, snapshot.result_id)
                    .await
                {
                    tracing::warn!(error = %e, "Could not update session record");
                }
            }
        }

        match effect {
            Effect::None => {}
            Effect::Navigate(route) => self.navigator.navigate(route),
            Effect::Clear(job_id) => self.clear(job_id).await,
            Effect::NavigateAndClear(route, job_id) => {
                self.navigator.navigate(route);
                self.clear(job_id).await;
            }
        }
        state
    }

    /// Apply one status answer to the state machine.
    fn decide(
        inner: &mut Inner,
        job_id: DbId,
        answer: Result<&JobSnapshot, &ClientError>,
    ) -> Effect {
        match answer {
            Ok(snapshot) => match snapshot.status {
                JobStatus::Completed => {
                    tracing::info!(job_id = %job_id, "Stored job completed, opening result");
                    inner.resolved = true;
                    inner.state = RecoveryState::Resumed;
                    Effect::NavigateAndClear(Route::Result(job_id), job_id)
                }
                JobStatus::Pending | JobStatus::Processing => {
                    inner.state = if inner.dismissed {
                        RecoveryState::Dismissed
                    } else {
                        RecoveryState::ShowPrompt {
                            job_id,
                            status: snapshot.status,
                        }
                    };
                    Effect::None
                }
                JobStatus::Failed => {
                    tracing::info!(job_id = %job_id, "Stored job failed, discarding session");
                    inner.resolved = true;
                    inner.state = RecoveryState::NoSession;
                    Effect::Clear(job_id)
                }
            },
            Err(ClientError::SessionExpired) => {
                tracing::info!(job_id = %job_id, "Stored session expired, discarding");
                inner.resolved = true;
                inner.state = RecoveryState::NoSession;
                Effect::Clear(job_id)
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Status check failed during recovery");
                if !inner.dismissed {
                    inner.state = RecoveryState::NoSession;
                }
                Effect::None
            }
        }
    }

    async fn clear(&self, job_id: DbId) {
        if let Err(e) = self.store.clear(job_id).await {
            tracing::warn!(job_id = %job_id, error = %e, "Could not clear session record");
        }
    }
}
