use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    Connection(String),
    #[error("database migration error: {0}")]
    Migration(String),
    #[error("database query error: {0}")]
    Query(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("record conflict: {0}")]
    Conflict(String),
    #[error("invalid stored value: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DatabaseError {
    fn from(err: tokio::task::JoinError) -> Self {
        DatabaseError::Query(format!("database task failed: {err}"))
    }
}
