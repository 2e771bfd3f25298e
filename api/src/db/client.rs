// HTTP client for the Snowflake REST session protocol

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::WarehouseConfig;
use crate::db::error::DbError;
use crate::db::row::{Column, ResultSet};

const CLIENT_APP_ID: &str = "SolanaTradersApi";
const SNOWFLAKE_ACCEPT: &str = "application/snowflake";

// Session token lifetime when the login response does not say
const DEFAULT_SESSION_VALIDITY: Duration = Duration::from_secs(3600);
// Idle sessions are replaced this long before the token runs out
const SESSION_RENEW_MARGIN: Duration = Duration::from_secs(60);

// Statement still running server side; poll `getResultUrl`
const QUERY_IN_PROGRESS: &str = "333333";
const QUERY_IN_PROGRESS_ASYNC: &str = "333334";

/// Positional bind value, sent as `{"type": ..., "value": ...}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Text(String),
    Fixed(i64),
}

impl Binding {
    fn to_json(&self) -> Value {
        match self {
            Binding::Text(value) => json!({ "type": "TEXT", "value": value }),
            Binding::Fixed(value) => json!({ "type": "FIXED", "value": value.to_string() }),
        }
    }
}

/// SQL text plus positional (`?`) bindings
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub bindings: Vec<Binding>,
}

impl Statement {
    pub fn from_string(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            bindings: Vec::new(),
        }
    }

    pub fn from_sql_and_values(sql: impl Into<String>, bindings: Vec<Binding>) -> Self {
        Self {
            sql: sql.into(),
            bindings,
        }
    }

    /// Request body for `/queries/v1/query-request`
    pub fn to_request_body(&self, sequence_id: u64) -> Value {
        let mut body = json!({
            "sqlText": self.sql,
            "asyncExec": false,
            "sequenceId": sequence_id,
            "querySubmissionTime": now_millis(),
        });
        if !self.bindings.is_empty() {
            let bindings: serde_json::Map<String, Value> = self
                .bindings
                .iter()
                .enumerate()
                .map(|(i, b)| ((i + 1).to_string(), b.to_json()))
                .collect();
            body["bindings"] = Value::Object(bindings);
        }
        body
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// An authenticated Snowflake session
#[derive(Debug)]
pub struct Session {
    token: String,
    sequence_id: u64,
    opened_at: Instant,
    validity: Duration,
}

impl Session {
    fn next_sequence(&mut self) -> u64 {
        self.sequence_id += 1;
        self.sequence_id
    }

    /// True once the token is within the renewal margin of its validity
    pub fn is_expired(&self) -> bool {
        past_renewal(self.opened_at.elapsed(), self.validity)
    }
}

fn past_renewal(age: Duration, validity: Duration) -> bool {
    let margin = (validity / 10).min(SESSION_RENEW_MARGIN);
    age + margin >= validity
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    token: Option<String>,
    validity_in_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    #[serde(default)]
    rowtype: Vec<Column>,
    #[serde(default)]
    rowset: Vec<Vec<Option<String>>>,
    #[serde(default)]
    rowset_base64: Option<String>,
    #[serde(default)]
    chunks: Vec<Chunk>,
    #[serde(default)]
    chunk_headers: HashMap<String, String>,
    qrmk: Option<String>,
    get_result_url: Option<String>,
    query_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Chunk {
    url: String,
    #[serde(default)]
    row_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct LoginRequestData<'a> {
    client_app_id: &'static str,
    client_app_version: &'static str,
    account_name: &'a str,
    login_name: &'a str,
    password: &'a str,
    session_parameters: Value,
    client_environment: Value,
}

/// Client for one Snowflake account
#[derive(Clone)]
pub struct SnowflakeClient {
    http: Client,
    base_url: String,
    config: WarehouseConfig,
}

impl SnowflakeClient {
    /// Creates a new client; no network traffic happens until [`SnowflakeClient::login`]
    pub fn new(config: &WarehouseConfig) -> Result<Self, DbError> {
        let http = Client::builder()
            .timeout(config.query_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DbError::connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Opens a session with password authentication
    pub async fn login(&self) -> Result<Session, DbError> {
        let missing = self.config.missing_credentials();
        if !missing.is_empty() {
            return Err(DbError::connection(format!(
                "Missing Snowflake credentials: {} (not loaded from parameter store or environment)",
                missing.join(", ")
            )));
        }

        let mut url = url::Url::parse(&format!("{}/session/v1/login-request", self.base_url))
            .map_err(|e| DbError::connection(format!("Invalid Snowflake URL {}: {}", self.base_url, e)))?;
        url.query_pairs_mut()
            .append_pair("requestId", &Uuid::new_v4().to_string())
            .append_pair("warehouse", &self.config.warehouse)
            .append_pair("databaseName", &self.config.database)
            .append_pair("schemaName", &self.config.schema)
            .append_pair("roleName", &self.config.role);

        // Account locator without region/cloud suffix
        let account_name = self
            .config
            .account
            .split('.')
            .next()
            .unwrap_or(&self.config.account);

        let data = LoginRequestData {
            client_app_id: CLIENT_APP_ID,
            client_app_version: env!("CARGO_PKG_VERSION"),
            account_name,
            login_name: &self.config.user,
            password: self.config.password.expose(),
            session_parameters: json!({ "QUERY_RESULT_FORMAT": "JSON" }),
            client_environment: json!({
                "APPLICATION": CLIENT_APP_ID,
                "OS": std::env::consts::OS,
            }),
        };
        let body = json!({ "data": data });

        let response = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| DbError::ConnectionError {
                message: format!("Login request failed: {}", e),
                source: Some(e),
            })?;

        let envelope: Envelope<LoginData> = read_envelope(response, "Login")
            .await
            .map_err(|e| match e {
                DbError::QueryError { message, source, .. } => DbError::ConnectionError {
                    message: format!("Unreadable login response: {}", message),
                    source,
                },
                other => other,
            })?;

        if !envelope.success {
            return Err(DbError::connection(format!(
                "Login failed{}: {}",
                envelope.code.map(|c| format!(" ({})", c)).unwrap_or_default(),
                envelope.message.unwrap_or_else(|| "no message".to_string())
            )));
        }

        let data = envelope
            .data
            .ok_or_else(|| DbError::connection("Login response carried no session token"))?;
        let token = data
            .token
            .ok_or_else(|| DbError::connection("Login response carried no session token"))?;
        let validity = data
            .validity_in_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SESSION_VALIDITY);

        tracing::debug!(
            "Opened Snowflake session for {} (valid for {:?})",
            self.config.redacted_connection_string(),
            validity
        );
        Ok(Session {
            token,
            sequence_id: 0,
            opened_at: Instant::now(),
            validity,
        })
    }

    /// Runs a statement synchronously and collects every row, inline and chunked
    pub async fn execute(
        &self,
        session: &mut Session,
        statement: &Statement,
    ) -> Result<ResultSet, DbError> {
        let started = Instant::now();
        let url = format!(
            "{}/queries/v1/query-request?requestId={}",
            self.base_url,
            Uuid::new_v4()
        );
        let body = statement.to_request_body(session.next_sequence());

        let response = self
            .http
            .post(&url)
            .headers(self.session_headers(session)?)
            .json(&body)
            .send()
            .await?;
        let mut envelope: Envelope<QueryData> = read_envelope(response, "Query request").await?;

        while !envelope.success
            && matches!(
                envelope.code.as_deref(),
                Some(QUERY_IN_PROGRESS) | Some(QUERY_IN_PROGRESS_ASYNC)
            )
        {
            if started.elapsed() >= self.config.query_timeout {
                return Err(DbError::query(
                    envelope.code.take(),
                    format!("Statement still running after {:?}", self.config.query_timeout),
                ));
            }
            let result_url = envelope
                .data
                .as_ref()
                .and_then(|d| d.get_result_url.clone())
                .ok_or_else(|| DbError::query(envelope.code.clone(), "In-progress response without result URL"))?;

            tokio::time::sleep(Duration::from_millis(500)).await;
            let response = self
                .http
                .get(format!("{}{}", self.base_url, result_url))
                .headers(self.session_headers(session)?)
                .send()
                .await?;
            envelope = read_envelope(response, "Result poll").await?;
        }

        if !envelope.success {
            return Err(DbError::from_code(
                envelope.code,
                envelope.message.unwrap_or_else(|| "Statement failed".to_string()),
            ));
        }

        let data = envelope.data.unwrap_or_default();
        if data.rowset_base64.as_deref().is_some_and(|b| !b.is_empty()) {
            return Err(DbError::query(
                None,
                "Warehouse returned an Arrow result; JSON result format is required",
            ));
        }

        let mut results = ResultSet::new(data.rowtype, data.rowset);
        if !data.chunks.is_empty() {
            let headers = chunk_headers(&data.chunk_headers, data.qrmk.as_deref())?;
            for chunk in &data.chunks {
                let rows = self.fetch_chunk(chunk, &headers).await?;
                if chunk.row_count != 0 && rows.len() != chunk.row_count {
                    tracing::warn!(
                        "Chunk advertised {} rows but returned {}",
                        chunk.row_count,
                        rows.len()
                    );
                }
                results.extend(rows);
            }
        }

        tracing::debug!(
            query_id = data.query_id.as_deref().unwrap_or("-"),
            rows = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Statement finished"
        );
        Ok(results)
    }

    /// Best-effort logout
    pub async fn close(&self, session: Session) {
        let url = format!("{}/session?delete=true", self.base_url);
        let headers = match self.session_headers(&session) {
            Ok(headers) => headers,
            Err(_) => return,
        };
        if let Err(e) = self.http.post(&url).headers(headers).send().await {
            tracing::warn!("Failed to close Snowflake session: {}", e);
        }
    }

    fn session_headers(&self, session: &Session) -> Result<HeaderMap, DbError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(SNOWFLAKE_ACCEPT));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth = HeaderValue::from_str(&format!("Snowflake Token=\"{}\"", session.token))
            .map_err(|_| DbError::connection("Session token is not a valid header value"))?;
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }

    async fn fetch_chunk(
        &self,
        chunk: &Chunk,
        headers: &HeaderMap,
    ) -> Result<Vec<Vec<Option<String>>>, DbError> {
        let response = self.http.get(&chunk.url).headers(headers.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DbError::query(
                None,
                format!("Result chunk download failed with HTTP {}", status),
            ));
        }
        let body = response.text().await?;
        parse_chunk(&body)
    }
}

/// Decodes a JSON envelope, treating any non-2xx answer as the endpoint being unavailable
async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
    what: &str,
) -> Result<Envelope<T>, DbError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.trim().chars().take(200).collect();
        return Err(DbError::connection(format!(
            "{} returned HTTP {}: {}",
            what, status, excerpt
        )));
    }
    Ok(response.json().await?)
}

/// Chunks are a comma-separated run of JSON arrays without the enclosing brackets
fn parse_chunk(body: &str) -> Result<Vec<Vec<Option<String>>>, DbError> {
    let trimmed = body.trim();
    let wrapped = if trimmed.starts_with("[[") || trimmed.is_empty() {
        trimmed.to_string()
    } else {
        format!("[{}]", trimmed)
    };
    if wrapped.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&wrapped)
        .map_err(|e| DbError::query(None, format!("Malformed result chunk: {}", e)))
}

fn chunk_headers(
    advertised: &HashMap<String, String>,
    qrmk: Option<&str>,
) -> Result<HeaderMap, DbError> {
    let mut headers = HeaderMap::new();
    let pairs: Vec<(String, String)> = if advertised.is_empty() {
        qrmk.map(|key| {
            vec![
                (
                    "x-amz-server-side-encryption-customer-algorithm".to_string(),
                    "AES256".to_string(),
                ),
                (
                    "x-amz-server-side-encryption-customer-key".to_string(),
                    key.to_string(),
                ),
            ]
        })
        .unwrap_or_default()
    } else {
        advertised.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    };

    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| DbError::query(None, format!("Invalid chunk header name {}", name)))?;
        let value = HeaderValue::from_str(&value)
            .map_err(|_| DbError::query(None, "Invalid chunk header value"))?;
        headers.insert(name, value);
    }
    Ok(headers)
}
