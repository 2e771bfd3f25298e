// Diagnostic endpoint handler implementation

use axum::{extract::State, Json};

use crate::handlers::AppState;
use crate::models::DebugResponse;
use crate::services::diagnostic::DiagnosticService;

/// Handler for GET /api/debug - Returns masked configuration, a live warehouse check and CORS policy
pub async fn debug_info(State(state): State<AppState>) -> Json<DebugResponse> {
    let diagnostic_service =
        DiagnosticService::new(&state.repositories.whale_notifications, &state.config);
    Json(diagnostic_service.diagnose().await)
}
