// API request/response models
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

pub use crate::entity::token_stats::Model as TokenStat;
pub use crate::entity::whale_notifications::Model as WhaleNotification;

/// Rows returned when the caller does not pass `limit`
pub const DEFAULT_NOTIFICATION_LIMIT: u32 = 100;

/// Query parameters for GET /api/whale-notifications.
///
/// `limit` stays a string so a malformed value becomes a 422 with the usual
/// error envelope instead of the extractor's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct WhaleNotificationsQuery {
    pub limit: Option<String>,
    pub symbol: Option<String>,
}

impl WhaleNotificationsQuery {
    pub fn limit(&self) -> Result<u32, ApiError> {
        match self.limit.as_deref().map(str::trim) {
            None | Some("") => Ok(DEFAULT_NOTIFICATION_LIMIT),
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                ApiError::InvalidRequest(format!(
                    "limit must be a non-negative integer, got {:?}",
                    raw
                ))
            }),
        }
    }

    /// Empty `symbol=` is the same as no filter
    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref().filter(|s| !s.is_empty())
    }
}

/// Response structure for GET /api/health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: NaiveDateTime,
}

/// Response structure for GET /api/debug
#[derive(Debug, Serialize)]
pub struct DebugResponse {
    pub timestamp: NaiveDateTime,
    pub environment: Value,
    pub connection_status: String,
    pub cors_settings: CorsSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorsSettings {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_credentials: bool,
}
