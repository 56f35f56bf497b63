/// All user primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Project ids are client-generated strings (projects can be created
/// offline, before the server has ever seen them).
pub type ProjectId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
