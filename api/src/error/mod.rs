use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::db::DbError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error(transparent)]
    Connection(DbError),
    #[error(transparent)]
    Query(DbError),
    #[error("Adapter error: {0}")]
    Adapter(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Stable, machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Configuration(_) => "ConfigurationError",
            ApiError::Connection(_) => "ConnectionError",
            ApiError::Query(_) => "QueryError",
            ApiError::Adapter(_) => "AdapterError",
            ApiError::InvalidRequest(_) => "InvalidRequest",
            ApiError::Timeout(_) => "Timeout",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The error followed by each of its causes, one line apiece
    pub fn trace(&self) -> Vec<String> {
        let mut lines = vec![format!("{}: {}", self.kind(), self)];
        let mut source = self.source();
        while let Some(err) = source {
            lines.push(format!("caused by: {}", err));
            source = err.source();
        }
        lines
    }

    /// Builds the response body, with the cause chain only when asked for
    pub fn detail(&self, expose_trace: bool) -> ErrorDetail {
        ErrorDetail {
            message: self.to_string(),
            kind: self.kind(),
            traceback: expose_trace.then(|| self.trace()),
        }
    }

    pub fn into_response_with_trace(self, expose_trace: bool) -> Response {
        if self.status().is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self.trace().join("\n"));
        }
        let body = Json(ErrorBody {
            detail: self.detail(expose_trace),
        });
        (self.status(), body).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: ErrorDetail,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with_trace(false)
    }
}

// DbError to ApiError conversion implementation
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConnectionError { .. } | DbError::SessionExpired { .. } => {
                ApiError::Connection(err)
            }
            DbError::QueryError { .. } | DbError::DecodeError { .. } => ApiError::Query(err),
        }
    }
}
