// Handlers for whale notification endpoints

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Response,
    Json,
};

use crate::error::ApiError;
use crate::handlers::AppState;
use crate::models::{WhaleNotification, WhaleNotificationsQuery};
use crate::services::whale_service;

/// Handler for GET /api/whale-notifications?limit=&symbol=
pub async fn get_whale_notifications(
    State(state): State<AppState>,
    params: Result<Query<WhaleNotificationsQuery>, QueryRejection>,
) -> Result<Json<Vec<WhaleNotification>>, Response> {
    let expose_trace = state.config.expose_error_trace;
    let result = async {
        let Query(params) = params.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
        let limit = params.limit()?;
        whale_service::get_whale_notifications(&state, limit, params.symbol()).await
    }
    .await;

    result
        .map(Json)
        .map_err(|err| err.into_response_with_trace(expose_trace))
}
