//! Retention horizon for uploaded jobs.

use chrono::Duration;

use crate::types::Timestamp;

/// Days a job (and its results) is kept after upload.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Number of style variants attempted per job unless configured otherwise.
pub const DEFAULT_VARIANT_COUNT: i16 = 4;

/// Upper bound accepted for the configured variant count.
pub const MAX_VARIANT_COUNT: i16 = 16;

pub fn expires_at(created_at: Timestamp, retention_days: i64) -> Timestamp {
    created_at + Duration::days(retention_days.max(1))
}
