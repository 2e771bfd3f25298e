// Error types for warehouse operations

use thiserror::Error;

/// Error types for warehouse connection and query operations
#[derive(Debug, Error)]
pub enum DbError {
    /// Login failed, credentials missing, or the endpoint was unreachable
    #[error("Warehouse connection error: {message}")]
    ConnectionError {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The statement was rejected or failed while executing
    #[error("Warehouse query error{}: {message}", code_suffix(.code))]
    QueryError {
        code: Option<String>,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The session token expired or was revoked; a fresh login fixes it
    #[error("Warehouse session expired{}: {message}", code_suffix(.code))]
    SessionExpired { code: Option<String>, message: String },

    /// A result cell could not be converted to the requested type
    #[error("Failed to decode column {column}: {message}")]
    DecodeError { column: String, message: String },
}

impl DbError {
    pub fn connection(message: impl Into<String>) -> Self {
        DbError::ConnectionError {
            message: message.into(),
            source: None,
        }
    }

    pub fn query(code: Option<String>, message: impl Into<String>) -> Self {
        DbError::QueryError {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Failure reported in a response envelope, classified by its Snowflake code
    pub fn from_code(code: Option<String>, message: impl Into<String>) -> Self {
        let expired = code
            .as_deref()
            .is_some_and(|c| SESSION_EXPIRED_CODES.contains(&c));
        if expired {
            DbError::SessionExpired {
                code,
                message: message.into(),
            }
        } else {
            DbError::query(code, message)
        }
    }

    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        DbError::DecodeError {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Whether the session that produced this error must not go back to the pool
    pub fn invalidates_session(&self) -> bool {
        match self {
            DbError::ConnectionError { .. } | DbError::SessionExpired { .. } => true,
            DbError::QueryError { source, .. } => source.is_some(),
            DbError::DecodeError { .. } => false,
        }
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" ({})", c))
        .unwrap_or_default()
}

/// Snowflake codes for an expired or unknown session token
pub const SESSION_EXPIRED_CODES: &[&str] = &["390111", "390112", "390114"];

impl From<reqwest::Error> for DbError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            DbError::ConnectionError {
                message: err.to_string(),
                source: Some(err),
            }
        } else {
            DbError::QueryError {
                code: None,
                message: err.to_string(),
                source: Some(err),
            }
        }
    }
}
