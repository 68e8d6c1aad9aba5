use rusqlite::ErrorCode;
use staffing::permission::{Module, Role};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RmpError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Database error: {0}")]
    DatabaseError(rusqlite::Error),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Invalid input: {0}")]
    ValidationError(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    StaffingError(#[from] staffing::Error),
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Role `{role}` is not allowed to {action} {module}")]
    Forbidden {
        role: Role,
        module: Module,
        action: &'static str,
    },
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Report error: {0}")]
    ReportError(String),
    #[error("Zoho error: {0}")]
    ZohoError(String),
    #[error("Error: {0}")]
    GenericError(String),
}

impl RmpError {
    pub fn not_found<I: ToString>(entity: &'static str, id: I) -> Self {
        RmpError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        RmpError::ValidationError(message.into())
    }
}

impl From<rusqlite::Error> for RmpError {
    fn from(error: rusqlite::Error) -> Self {
        match &error {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                RmpError::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "constraint violation".to_string()),
                )
            }
            _ => RmpError::DatabaseError(error),
        }
    }
}

impl From<serde_json::error::Error> for RmpError {
    fn from(e: serde_json::error::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

impl From<toml::de::Error> for RmpError {
    fn from(error: toml::de::Error) -> Self {
        Self::DeserializationError(error.to_string())
    }
}

impl From<reqwest::Error> for RmpError {
    fn from(error: reqwest::Error) -> Self {
        Self::ZohoError(error.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for RmpError {
    fn from(error: rust_xlsxwriter::XlsxError) -> Self {
        Self::ReportError(error.to_string())
    }
}

impl From<lopdf::Error> for RmpError {
    fn from(error: lopdf::Error) -> Self {
        Self::ReportError(error.to_string())
    }
}

impl From<tokio::task::JoinError> for RmpError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::GenericError(error.to_string())
    }
}

impl From<anyhow::Error> for RmpError {
    fn from(error: anyhow::Error) -> Self {
        Self::GenericError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::RmpError;

    #[test]
    fn test_unique_violation_is_conflict() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let error: RmpError = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(matches!(error, RmpError::Conflict(_)));
    }
}
