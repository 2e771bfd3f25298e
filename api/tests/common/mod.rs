// Stub Snowflake REST endpoint and fixtures shared by the integration tests
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get as get_route, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceExt;

use solana_traders_api::config::{ApiConfig, Secret, WarehouseConfig};
use solana_traders_api::handlers::{AppContext, AppState};
use solana_traders_api::routes::build_router;

pub const PASSWORD: &str = "correct horse";

/// Header the stub advertises in `chunkHeaders` and requires on chunk downloads
pub const CHUNK_HEADER: (&str, &str) = ("x-stub-chunk-key", "secret-1");
pub const CHUNK_QRMK: &str = "c3R1Yi1jaHVuay1rZXk=";
const SSE_KEY_HEADER: &str = "x-amz-server-side-encryption-customer-key";

#[derive(Debug, Clone)]
pub struct Fixture {
    pub id: i64,
    pub timestamp: i64,
    pub symbol: &'static str,
    pub name: &'static str,
    pub bought: i64,
    pub sold: i64,
}

pub fn fixture(id: i64, timestamp: i64, symbol: &'static str, bought: i64, sold: i64) -> Fixture {
    let name = match symbol {
        "SOL" => "Solana",
        "BONK" => "Bonk",
        "A" => "Token A",
        "B" => "Token B",
        _ => "Other",
    };
    Fixture {
        id,
        timestamp,
        symbol,
        name,
        bought,
        sold,
    }
}

/// Five SOL rows and three rows for other symbols
pub fn mixed_fixtures() -> Vec<Fixture> {
    vec![
        fixture(1, 1_700_000_100, "SOL", 4, 1),
        fixture(2, 1_700_000_500, "SOL", 2, 2),
        fixture(3, 1_700_000_300, "BONK", 9, 0),
        fixture(4, 1_700_000_200, "SOL", 1, 3),
        fixture(5, 1_700_000_900, "SOL", 7, 0),
        fixture(6, 1_700_000_800, "BONK", 1, 1),
        fixture(7, 1_700_000_400, "SOL", 0, 6),
        fixture(8, 1_700_000_700, "WIF", 3, 3),
    ]
}

#[derive(Default)]
pub struct StubState {
    pub url: String,
    pub rows: Vec<Fixture>,
    pub logins: AtomicUsize,
    pub queries: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub fail_queries: AtomicBool,
    pub query_delay_ms: AtomicUsize,
    pub sql_seen: Mutex<Vec<String>>,
    /// `validityInSeconds` returned by login; zero leaves the field out
    pub validity_secs: AtomicUsize,
    /// Query endpoint answers 503 with an HTML page
    pub unavailable: AtomicBool,
    /// Result polls answered "still running" before the rows are handed out
    pub async_polls: AtomicUsize,
    pub result_polls: AtomicUsize,
    /// Rows per chunk; zero keeps every row inline
    pub chunk_size: AtomicUsize,
    /// Advertise `qrmk` instead of `chunkHeaders`
    pub chunk_qrmk: AtomicBool,
    pub chunk_fetches: AtomicUsize,
    issued: Mutex<HashSet<String>>,
    expired: Mutex<HashSet<String>>,
    pending: Mutex<HashMap<String, Value>>,
    chunks: Mutex<Vec<String>>,
}

impl StubState {
    /// Every token issued so far is rejected as expired from now on
    pub fn expire_all(&self) {
        let issued = self.issued.lock().unwrap().clone();
        self.expired.lock().unwrap().extend(issued);
    }
}

pub struct StubWarehouse {
    pub url: String,
    pub state: Arc<StubState>,
}

/// Serves login, query, result polling, chunk download and logout on an ephemeral port
pub async fn spawn_stub(rows: Vec<Fixture>) -> StubWarehouse {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let state = Arc::new(StubState {
        url: url.clone(),
        rows,
        ..Default::default()
    });
    let app = Router::new()
        .route("/session/v1/login-request", post(login))
        .route("/queries/v1/query-request", post(query))
        .route("/queries/{id}/result", get_route(result))
        .route("/chunks/{index}", get_route(chunk))
        .route("/session", post(logout))
        .with_state(Arc::clone(&state));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubWarehouse { url, state }
}

async fn login(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> Json<Value> {
    let n = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
    if body["data"]["PASSWORD"] != PASSWORD {
        return Json(json!({
            "data": null,
            "code": "390100",
            "message": "Incorrect username or password was specified.",
            "success": false
        }));
    }

    let token = format!("stub-token-{}", n);
    state.issued.lock().unwrap().insert(token.clone());
    let mut data = json!({ "token": token, "masterToken": "stub-master" });
    let validity = state.validity_secs.load(Ordering::SeqCst);
    if validity > 0 {
        data["validityInSeconds"] = json!(validity);
    }
    Json(json!({ "data": data, "code": null, "message": null, "success": true }))
}

enum Auth {
    Valid,
    Expired,
    Rejected,
}

fn authenticate(state: &StubState, headers: &HeaderMap) -> Auth {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Snowflake Token=\""))
        .and_then(|v| v.strip_suffix('"'));
    match token {
        Some(token) if state.expired.lock().unwrap().contains(token) => Auth::Expired,
        Some(token) if state.issued.lock().unwrap().contains(token) => Auth::Valid,
        _ => Auth::Rejected,
    }
}

fn session_expired() -> Response {
    Json(json!({
        "data": null,
        "code": "390112",
        "message": "Your session has expired. Please login again.",
        "success": false
    }))
    .into_response()
}

async fn logout() -> Json<Value> {
    Json(json!({ "data": null, "code": null, "message": null, "success": true }))
}

async fn query(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if state.unavailable.load(Ordering::SeqCst) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/html")],
            "<html><body>Service Unavailable</body></html>",
        )
            .into_response();
    }
    match authenticate(&state, &headers) {
        Auth::Valid => {}
        Auth::Expired => return session_expired(),
        Auth::Rejected => return StatusCode::UNAUTHORIZED.into_response(),
    }

    let query_id = format!("q-{}", state.queries.fetch_add(1, Ordering::SeqCst) + 1);
    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);
    let delay = state.query_delay_ms.load(Ordering::SeqCst) as u64;
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    let sql = body["sqlText"].as_str().unwrap_or_default().to_string();
    state.sql_seen.lock().unwrap().push(sql.clone());

    if state.fail_queries.load(Ordering::SeqCst) {
        return Json(json!({
            "data": { "queryId": query_id },
            "code": "002003",
            "message": "SQL compilation error: Object 'DEV.BRONZE.WHALE_NOTIFICATIONS' does not exist or not authorized.",
            "success": false
        }))
        .into_response();
    }

    let data = if sql.contains("CURRENT_WAREHOUSE") {
        json!({
            "rowtype": [{ "name": "CURRENT_WAREHOUSE()", "type": "text", "nullable": true }],
            "rowset": [["DEV_WH"]]
        })
    } else if sql.contains("GROUP BY") {
        token_stats(&state.rows)
    } else {
        notifications(&state.rows, &sql, &body["bindings"])
    };
    let data = split_into_chunks(&state, data);

    if state.async_polls.load(Ordering::SeqCst) > 0 {
        state.pending.lock().unwrap().insert(query_id.clone(), data);
        return still_running("333334", &query_id).into_response();
    }
    Json(json!({ "data": data, "code": null, "message": null, "success": true })).into_response()
}

fn still_running(code: &str, query_id: &str) -> Json<Value> {
    Json(json!({
        "data": {
            "queryId": query_id,
            "getResultUrl": format!("/queries/{}/result", query_id)
        },
        "code": code,
        "message": "Asynchronous execution in progress.",
        "success": false
    }))
}

async fn result(
    State(state): State<Arc<StubState>>,
    Path(query_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    match authenticate(&state, &headers) {
        Auth::Valid => {}
        Auth::Expired => return session_expired(),
        Auth::Rejected => return StatusCode::UNAUTHORIZED.into_response(),
    }
    state.result_polls.fetch_add(1, Ordering::SeqCst);

    let left = state
        .async_polls
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
        .unwrap()
        .saturating_sub(1);
    if left > 0 {
        return still_running("333333", &query_id).into_response();
    }
    match state.pending.lock().unwrap().remove(&query_id) {
        Some(data) => {
            Json(json!({ "data": data, "code": null, "message": null, "success": true }))
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// Keeps the first `chunk_size` rows inline and serves the rest as chunk downloads
fn split_into_chunks(state: &StubState, mut data: Value) -> Value {
    let size = state.chunk_size.load(Ordering::SeqCst);
    let rows = match data["rowset"].as_array() {
        Some(rows) if size > 0 && rows.len() > size => rows.clone(),
        _ => return data,
    };

    let mut chunks = state.chunks.lock().unwrap();
    let mut advertised = Vec::new();
    for part in rows[size..].chunks(size) {
        let body = part
            .iter()
            .map(|row| row.to_string())
            .collect::<Vec<_>>()
            .join(",\n");
        chunks.push(body);
        advertised.push(json!({
            "url": format!("{}/chunks/{}", state.url, chunks.len() - 1),
            "rowCount": part.len()
        }));
    }

    data["rowset"] = Value::Array(rows[..size].to_vec());
    data["chunks"] = Value::Array(advertised);
    if state.chunk_qrmk.load(Ordering::SeqCst) {
        data["qrmk"] = json!(CHUNK_QRMK);
    } else {
        let mut chunk_headers = serde_json::Map::new();
        chunk_headers.insert(CHUNK_HEADER.0.to_string(), json!(CHUNK_HEADER.1));
        data["chunkHeaders"] = Value::Object(chunk_headers);
    }
    data
}

async fn chunk(
    State(state): State<Arc<StubState>>,
    Path(index): Path<usize>,
    headers: HeaderMap,
) -> Response {
    let (name, expected) = if state.chunk_qrmk.load(Ordering::SeqCst) {
        (SSE_KEY_HEADER, CHUNK_QRMK)
    } else {
        CHUNK_HEADER
    };
    if headers.get(name).and_then(|v| v.to_str().ok()) != Some(expected) {
        return StatusCode::FORBIDDEN.into_response();
    }
    // Chunk downloads are presigned; the session token must not travel with them
    if headers.contains_key(header::AUTHORIZATION) {
        return StatusCode::BAD_REQUEST.into_response();
    }

    match state.chunks.lock().unwrap().get(index).cloned() {
        Some(body) => {
            state.chunk_fetches.fetch_add(1, Ordering::SeqCst);
            body.into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn binding(bindings: &Value, position: &str) -> Option<String> {
    bindings[position]["value"].as_str().map(String::from)
}

// Mirrors the listing statement: exact symbol match, newest first, LIMIT
fn notifications(rows: &[Fixture], sql: &str, bindings: &Value) -> Value {
    let (symbol, limit) = if sql.contains("WHERE SYMBOL = ?") {
        (binding(bindings, "1"), binding(bindings, "2"))
    } else {
        (None, binding(bindings, "1"))
    };
    let limit: usize = limit.and_then(|l| l.parse().ok()).unwrap_or(usize::MAX);

    let mut matching: Vec<&Fixture> = rows
        .iter()
        .filter(|r| symbol.as_deref().map_or(true, |s| r.symbol == s))
        .collect();
    matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let rowset: Vec<Value> = matching
        .into_iter()
        .take(limit)
        .map(|r| {
            json!([
                r.id.to_string(),
                format!("{}.000000000", r.timestamp),
                format!("wallet{}", r.id),
                r.symbol,
                r.name,
                "1h",
                r.bought.to_string(),
                r.sold.to_string(),
                format!("{}.500000000", r.timestamp + 60),
            ])
        })
        .collect();

    // Lower-case names on purpose: the service must normalise them
    json!({
        "rowtype": [
            { "name": "notification_id", "type": "fixed", "scale": 0 },
            { "name": "timestamp", "type": "timestamp_ntz" },
            { "name": "address", "type": "text" },
            { "name": "symbol", "type": "text" },
            { "name": "name", "type": "text" },
            { "name": "time_interval", "type": "text" },
            { "name": "num_users_bought", "type": "fixed", "scale": 0 },
            { "name": "num_users_sold", "type": "fixed", "scale": 0 },
            { "name": "inserted_at", "type": "timestamp_ntz" }
        ],
        "rowset": rowset,
        "total": rowset.len(),
        "returned": rowset.len(),
        "queryId": "q-list"
    })
}

fn token_stats(rows: &[Fixture]) -> Value {
    let mut groups: BTreeMap<(&str, &str), (i64, i64, i64, i64)> = BTreeMap::new();
    for r in rows {
        let entry = groups.entry((r.symbol, r.name)).or_insert((0, 0, 0, i64::MIN));
        entry.0 += 1;
        entry.1 += r.bought;
        entry.2 += r.sold;
        entry.3 = entry.3.max(r.timestamp);
    }
    let mut stats: Vec<_> = groups.into_iter().collect();
    stats.sort_by(|a, b| (b.1 .1 - b.1 .2).cmp(&(a.1 .1 - a.1 .2)));

    let rowset: Vec<Value> = stats
        .into_iter()
        .map(|((symbol, name), (count, buys, sells, latest))| {
            json!([
                symbol,
                name,
                count.to_string(),
                buys.to_string(),
                sells.to_string(),
                (buys - sells).to_string(),
                format!("{}.000000000", latest),
            ])
        })
        .collect();

    json!({
        "rowtype": [
            { "name": "SYMBOL", "type": "text" },
            { "name": "NAME", "type": "text" },
            { "name": "NOTIFICATION_COUNT", "type": "fixed" },
            { "name": "TOTAL_BUYS", "type": "fixed" },
            { "name": "TOTAL_SELLS", "type": "fixed" },
            { "name": "NET_ACTIVITY", "type": "fixed" },
            { "name": "LATEST_ACTIVITY", "type": "timestamp_ntz" }
        ],
        "rowset": rowset,
        "queryId": "q-stats"
    })
}

pub fn warehouse_config(url: &str, password: &str) -> WarehouseConfig {
    WarehouseConfig {
        account: "stub".into(),
        user: "svc_api".into(),
        password: Secret::new(password),
        warehouse: "DEV_WH".into(),
        database: "DEV".into(),
        schema: "BRONZE".into(),
        role: "AIRFLOW_ROLE".into(),
        host: Some(url.to_string()),
        pool_size: 5,
        query_timeout: Duration::from_secs(5),
    }
}

pub fn api_config(warehouse: WarehouseConfig, expose_trace: bool) -> ApiConfig {
    let lookup = move |key: &str| match key {
        "API_EXPOSE_ERROR_TRACE" if expose_trace => Some("true".to_string()),
        _ => None,
    };
    ApiConfig::with_warehouse(lookup, warehouse).unwrap()
}

pub fn app_state(config: ApiConfig) -> AppState {
    Arc::new(AppContext::new(config).unwrap())
}

/// Sends one request through the full router and returns status, headers and JSON body
pub async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = build_router(Arc::clone(state)).oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

pub async fn get(state: &AppState, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, _, body) = send(state, request).await;
    (status, body)
}
