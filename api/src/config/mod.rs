// Configuration management from environment variables and the parameter store

mod parameters;

pub use parameters::{ParameterStore, ParameterStoreError, PARAMETER_PREFIX};

use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;
use url::form_urlencoded::byte_serialize;

pub const DEFAULT_WAREHOUSE: &str = "DEV_WH";
pub const DEFAULT_DATABASE: &str = "DEV";
pub const DEFAULT_SCHEMA: &str = "BRONZE";
pub const DEFAULT_ROLE: &str = "AIRFLOW_ROLE";

/// Warehouse HTTP timeout unless `SNOWFLAKE_QUERY_TIMEOUT_SECS` overrides it
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 60;

/// Hard ceiling on concurrent warehouse sessions. There is no overflow beyond it.
pub const WAREHOUSE_POOL_SIZE: usize = 5;

/// Origins allowed to call the API from a browser unless `CORS_ALLOWED_ORIGINS` overrides them
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "https://b6erx3uy97.execute-api.us-east-1.amazonaws.com",
];

/// Errors raised while resolving configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required Snowflake connection parameters: {}", .0.join(", "))]
    MissingRequired(Vec<&'static str>),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// String wrapper that never prints its contents
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(******)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("******")
    }
}

/// Connection parameters for the Snowflake warehouse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseConfig {
    pub account: String,
    pub user: String,
    pub password: Secret,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub role: String,

    /// Base URL override, e.g. a private-link endpoint
    pub host: Option<String>,
    pub pool_size: usize,
    pub query_timeout: Duration,
}

impl WarehouseConfig {
    /// Builds the configuration from `SNOWFLAKE_*` variables, failing fast on missing credentials
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`WarehouseConfig::from_env`] with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let account = get("SNOWFLAKE_ACCOUNT");
        let user = get("SNOWFLAKE_USER");
        let password = get("SNOWFLAKE_PASSWORD");

        let missing: Vec<&'static str> = [
            ("SNOWFLAKE_ACCOUNT", account.is_none()),
            ("SNOWFLAKE_USER", user.is_none()),
            ("SNOWFLAKE_PASSWORD", password.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect();

        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired(missing));
        }

        let query_timeout = match get("SNOWFLAKE_QUERY_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "SNOWFLAKE_QUERY_TIMEOUT_SECS",
                value: raw.clone(),
            })?),
            None => Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        };

        Ok(Self {
            account: account.unwrap_or_default(),
            user: user.unwrap_or_default(),
            password: Secret::new(password.unwrap_or_default()),
            warehouse: get("SNOWFLAKE_WAREHOUSE").unwrap_or_else(|| DEFAULT_WAREHOUSE.to_string()),
            database: get("SNOWFLAKE_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            schema: get("SNOWFLAKE_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            role: get("SNOWFLAKE_ROLE").unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            host: get("SNOWFLAKE_HOST"),
            pool_size: WAREHOUSE_POOL_SIZE,
            query_timeout,
        })
    }

    /// Names of required credentials that are still empty.
    ///
    /// Only function mode can produce a config with gaps; the first warehouse
    /// checkout reports them.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.account.is_empty() {
            missing.push("SNOWFLAKE_ACCOUNT");
        }
        if self.user.is_empty() {
            missing.push("SNOWFLAKE_USER");
        }
        if self.password.is_empty() {
            missing.push("SNOWFLAKE_PASSWORD");
        }
        missing
    }

    /// Base URL of the account's REST endpoint
    pub fn base_url(&self) -> String {
        match &self.host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => format!("https://{}.snowflakecomputing.com", self.account),
        }
    }

    /// Connection string in the `snowflake://` DSN form with percent-encoded credentials
    pub fn connection_string(&self) -> String {
        self.format_dsn(&encode(self.password.expose()))
    }

    /// Connection string safe for logs and diagnostics
    pub fn redacted_connection_string(&self) -> String {
        self.format_dsn("******")
    }

    fn format_dsn(&self, password: &str) -> String {
        format!(
            "snowflake://{}:{}@{}/{}/{}?warehouse={}&role={}",
            encode(&self.user),
            password,
            encode(&self.account),
            self.database,
            self.schema,
            self.warehouse,
            self.role
        )
    }
}

/// `1`, `true` or `yes`, case-insensitive
pub fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn encode(raw: &str) -> String {
    byte_serialize(raw.as_bytes()).collect()
}

/// Configuration settings for the Solana Traders API server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    // Server configuration
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub expose_error_trace: bool,
    pub cors_origins: Vec<String>,

    // Warehouse configuration
    pub warehouse: WarehouseConfig,
}

impl ApiConfig {
    /// Creates configuration instance from environment variables with defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let warehouse = WarehouseConfig::from_env()?;
        Self::with_warehouse(|key| env::var(key).ok(), warehouse)
    }

    /// Reads the server-level settings and attaches an already resolved warehouse config
    pub fn with_warehouse<F>(lookup: F, warehouse: WarehouseConfig) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw.clone(),
            })?,
            None => 8000,
        };
        let request_timeout = match get("API_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::Invalid {
                    key: "API_REQUEST_TIMEOUT_SECS",
                    value: raw.clone(),
                }
            })?),
            None => Duration::from_secs(30),
        };
        let expose_error_trace = get("API_EXPOSE_ERROR_TRACE")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        let cors_origins = match get("CORS_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Ok(Self {
            host,
            port,
            request_timeout,
            expose_error_trace,
            cors_origins,
            warehouse,
        })
    }

    /// Returns formatted server address string (host:port)
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
