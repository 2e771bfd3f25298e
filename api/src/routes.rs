// Router assembly shared by the server and the function adapter

use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    BoxError, Json, Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::handlers::{
    debug_info, get_token_stats, get_whale_notifications, health_check, AppState,
};

pub const ALLOWED_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

/// Builds the API router with CORS, tracing and the request timeout applied
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let request_timeout = state.config.request_timeout;
    let expose_trace = state.config.expose_error_trace;

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/debug", get(debug_info))
        .route("/api/whale-notifications", get(get_whale_notifications))
        .route("/api/token-stats", get(get_token_stats))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                    handle_middleware_error(err, request_timeout, expose_trace)
                }))
                .timeout(request_timeout),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Configure CORS policy: fixed origins, credentials allowed, any request header
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    // Wildcards cannot be combined with credentials, so request headers are
    // mirrored and every header the API emits is listed explicitly.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(ALLOWED_METHODS.to_vec())
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_LENGTH, header::DATE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

fn handle_middleware_error(err: BoxError, timeout: Duration, expose_trace: bool) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::Timeout(timeout).into_response_with_trace(expose_trace)
    } else {
        ApiError::Adapter(err.to_string()).into_response_with_trace(expose_trace)
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" })))
}
