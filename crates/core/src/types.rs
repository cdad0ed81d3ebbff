/// All primary keys are server-generated UUIDv4 values.
pub type DbId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Zero-based ordinal of a style variant within a job.
pub type VariantIndex = i16;
