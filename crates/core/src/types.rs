/// Job identifiers are opaque strings issued by the compute backend.
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
