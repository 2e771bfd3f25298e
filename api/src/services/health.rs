// Health check service implementation

use chrono::Local;

use crate::models::HealthResponse;

pub struct HealthChecker;

impl HealthChecker {
    pub fn new() -> Self {
        Self
    }

    /// Never touches the warehouse, so it answers even when Snowflake is down
    pub fn check(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".to_string(),
            timestamp: Local::now().naive_local(),
        }
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}
