//! Durable client-side session records.
//!
//! One record per job, plus a pointer to the job the user most recently
//! uploaded. Records are hints only: every decision made from one is
//! re-validated against the status endpoint first.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sonogen_core::status::JobStatus;
use sonogen_core::types::{DbId, Timestamp};
use tokio::sync::{Mutex, RwLock};

use crate::error::ClientError;

/// Key prefix for per-job records.
pub const RECORD_KEY_PREFIX: &str = "sonogen.session.";

/// Key holding the id of the most recent upload.
pub const ACTIVE_KEY: &str = "sonogen.session.active";

/// What the client remembers about one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub job_id: DbId,
    pub session_credential: String,
    pub created_at: Timestamp,
    pub last_known_status: JobStatus,
    pub last_known_result_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Storage backends
// ---------------------------------------------------------------------------

/// Narrow key-value interface the session store persists through.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    /// Returns whether the key existed.
    async fn remove(&self, key: &str) -> Result<bool, ClientError>;
}

/// Process-local storage. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, ClientError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}

/// Storage backed by a single JSON object on disk.
///
/// Every write replaces the file through a temporary sibling and a rename,
/// so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> Result<HashMap<String, String>, ClientError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), ClientError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<bool, ClientError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.write_all(&entries).await?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Session store
// ---------------------------------------------------------------------------

/// Typed access to session records over any [`SessionStorage`].
///
/// Cheaply cloneable; clones share the same backend.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
}

fn record_key(job_id: DbId) -> String {
    format!("{RECORD_KEY_PREFIX}{job_id}")
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Remember a fresh upload and make it the active session.
    pub async fn start(
        &self,
        job_id: DbId,
        session_credential: String,
        status: JobStatus,
    ) -> Result<SessionRecord, ClientError> {
        let record = SessionRecord {
            job_id,
            session_credential,
            created_at: Utc::now(),
            last_known_status: status,
            last_known_result_id: None,
        };
        self.save(&record).await?;
        self.storage.set(ACTIVE_KEY, &job_id.to_string()).await?;
        tracing::debug!(job_id = %job_id, "Session record created");
        Ok(record)
    }

    pub async fn save(&self, record: &SessionRecord) -> Result<(), ClientError> {
        let value = serde_json::to_string(record)?;
        self.storage.set(&record_key(record.job_id), &value).await
    }

    /// Load the record for `job_id`. A record that no longer decodes is
    /// discarded and reported as absent.
    pub async fn load(&self, job_id: DbId) -> Result<Option<SessionRecord>, ClientError> {
        let key = record_key(job_id);
        let Some(raw) = self.storage.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Discarding unreadable session record");
                self.storage.remove(&key).await?;
                Ok(None)
            }
        }
    }

    /// The record of the most recent upload, if it is still stored.
    pub async fn active(&self) -> Result<Option<SessionRecord>, ClientError> {
        let Some(raw_id) = self.storage.get(ACTIVE_KEY).await? else {
            return Ok(None);
        };
        let Ok(job_id) = raw_id.parse::<DbId>() else {
            self.storage.remove(ACTIVE_KEY).await?;
            return Ok(None);
        };
        self.load(job_id).await
    }

    /// Record what the server last said. A no-op when the record is gone.
    pub async fn update_status(
        &self,
        job_id: DbId,
        status: JobStatus,
        result_id: Option<DbId>,
    ) -> Result<(), ClientError> {
        let Some(mut record) = self.load(job_id).await? else {
            return Ok(());
        };
        if record.last_known_status == status && record.last_known_result_id == result_id {
            return Ok(());
        }
        record.last_known_status = status;
        record.last_known_result_id = result_id.or(record.last_known_result_id);
        self.save(&record).await
    }

    /// Drop the record for `job_id`, and the active pointer if it points
    /// there. Returns whether a record was removed.
    pub async fn clear(&self, job_id: DbId) -> Result<bool, ClientError> {
        let removed = self.storage.remove(&record_key(job_id)).await?;
        if self.storage.get(ACTIVE_KEY).await?.as_deref() == Some(job_id.to_string().as_str()) {
            self.storage.remove(ACTIVE_KEY).await?;
        }
        if removed {
            tracing::debug!(job_id = %job_id, "Session record cleared");
        }
        Ok(removed)
    }
}
