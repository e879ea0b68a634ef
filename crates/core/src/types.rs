/// Jobs are keyed by random (v4) UUIDs; the id doubles as the artifact file stem.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
