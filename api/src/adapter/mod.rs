// Function-mode invocation adapter: gateway request in, router response out

mod ssm;

pub use ssm::SsmParameterStore;

use std::env;
use std::sync::Arc;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use http::{StatusCode, Uri};
use lambda_http::RequestExt;
use serde_json::json;
use tokio::sync::Mutex;
use tower::ServiceExt;

use crate::config::{is_truthy, ApiConfig, ParameterStore, WarehouseConfig};
use crate::error::ApiError;
use crate::handlers::{AppContext, AppState};
use crate::routes::build_router;

struct Loaded {
    config: ApiConfig,
    state: AppState,
    router: Router,
}

/// Serves gateway invocations through the same router as the long-running server.
///
/// Credentials are re-read from the parameter store on every invocation; the
/// warehouse pool is only rebuilt when the resolved configuration changes.
pub struct FunctionAdapter {
    store: Arc<dyn ParameterStore>,
    loaded: Mutex<Option<Loaded>>,
}

impl FunctionAdapter {
    pub fn new(store: Arc<dyn ParameterStore>) -> Self {
        Self {
            store,
            loaded: Mutex::new(None),
        }
    }

    /// Handles one invocation. Failures become a 500 response, never an `Err`.
    pub async fn handle(&self, request: lambda_http::Request) -> Response {
        tracing::info!(method = %request.method(), path = request.uri().path(), "Received request");

        match self.try_handle(request).await {
            Ok(response) => {
                tracing::info!(status = response.status().as_u16(), "Response");
                response
            }
            Err(err) => {
                tracing::error!(kind = err.kind(), "Unhandled exception:\n{}", err.trace().join("\n"));
                error_response(&err, expose_trace_from_env())
            }
        }
    }

    async fn try_handle(&self, request: lambda_http::Request) -> Result<Response, ApiError> {
        let router = self.load_credentials().await?;
        let request = into_router_request(request)?;
        let response = router
            .oneshot(request)
            .await
            .unwrap_or_else(|never| match never {});
        Ok(response)
    }

    /// Refreshes credentials and returns a router bound to them
    async fn load_credentials(&self) -> Result<Router, ApiError> {
        let warehouse = WarehouseConfig::from_parameter_store(self.store.as_ref()).await;
        let config = ApiConfig::with_warehouse(|key| env::var(key).ok(), warehouse)?;

        let mut loaded = self.loaded.lock().await;
        if let Some(current) = loaded.as_ref().filter(|l| l.config == config) {
            return Ok(current.router.clone());
        }

        let state: AppState = Arc::new(AppContext::new(config.clone())?);
        let router = build_router(Arc::clone(&state));
        if let Some(previous) = loaded.replace(Loaded {
            config,
            state,
            router: router.clone(),
        }) {
            tracing::info!("Warehouse configuration changed; replacing pool");
            previous.state.pool().close().await;
        }
        Ok(router)
    }
}

/// Re-bodies a gateway request for the router, routing on the path the client sent
/// (REST API events carry the stage as a path prefix)
pub fn into_router_request(request: lambda_http::Request) -> Result<http::Request<Body>, ApiError> {
    let raw_path = request.raw_http_path().to_string();
    let (mut parts, body) = request.into_parts();

    if !raw_path.is_empty() && raw_path != parts.uri.path() {
        let path_and_query = match parts.uri.query() {
            Some(query) => format!("{}?{}", raw_path, query),
            None => raw_path,
        };
        parts.uri = path_and_query
            .parse::<Uri>()
            .map_err(|e| ApiError::Adapter(format!("Invalid request path: {}", e)))?;
    }

    let body = match body {
        lambda_http::Body::Empty => Body::empty(),
        lambda_http::Body::Text(text) => Body::from(text),
        lambda_http::Body::Binary(bytes) => Body::from(bytes),
    };
    Ok(http::Request::from_parts(parts, body))
}

/// 500 response for failures that never reached the router
pub fn error_response(err: &ApiError, expose_trace: bool) -> Response {
    let mut body = json!({
        "error": "Internal Server Error",
        "details": err.to_string(),
        "type": err.kind(),
    });
    if expose_trace {
        body["traceback"] = json!(err.trace());
    }
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

fn expose_trace_from_env() -> bool {
    env::var("API_EXPOSE_ERROR_TRACE")
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}
