// Health check endpoint handler implementation

use axum::Json;

use crate::models::HealthResponse;
use crate::services::health::HealthChecker;

/// Handler for GET /api/health - Returns status and server time without touching the warehouse
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthChecker::new().check())
}
