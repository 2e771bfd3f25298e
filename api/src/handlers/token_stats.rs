// Handler for per-token aggregate statistics

use axum::{extract::State, response::Response, Json};

use crate::handlers::AppState;
use crate::models::TokenStat;
use crate::services::whale_service;

/// Handler for GET /api/token-stats
pub async fn get_token_stats(
    State(state): State<AppState>,
) -> Result<Json<Vec<TokenStat>>, Response> {
    whale_service::get_token_stats(&state)
        .await
        .map(Json)
        .map_err(|err| err.into_response_with_trace(state.config.expose_error_trace))
}
