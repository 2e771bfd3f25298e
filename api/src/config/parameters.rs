// Warehouse configuration resolved from a remote parameter store (function mode)

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::{
    Secret, WarehouseConfig, DEFAULT_DATABASE, DEFAULT_ROLE, DEFAULT_SCHEMA, DEFAULT_WAREHOUSE,
    DEFAULT_QUERY_TIMEOUT_SECS, WAREHOUSE_POOL_SIZE,
};

/// Namespace every Snowflake parameter lives under
pub const PARAMETER_PREFIX: &str = "/solana-traders/snowflake/";

#[derive(Debug, Error)]
#[error("Error getting parameter {name}: {message}")]
pub struct ParameterStoreError {
    pub name: String,
    pub message: String,
}

/// Key-value secret source queried once per invocation
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn get_parameter(
        &self,
        name: &str,
        with_decryption: bool,
    ) -> Result<String, ParameterStoreError>;
}

impl WarehouseConfig {
    /// Resolves the warehouse configuration from the parameter store.
    ///
    /// Optional parameters fall back to the static defaults. A secret that
    /// cannot be fetched is logged and falls back to the process environment;
    /// if that is empty too the field stays empty and the first checkout fails.
    pub async fn from_parameter_store(store: &dyn ParameterStore) -> Self {
        Self::from_parameter_store_with(store, |key| env::var(key).ok()).await
    }

    /// Same as [`WarehouseConfig::from_parameter_store`] with an injectable environment
    pub async fn from_parameter_store_with<F>(store: &dyn ParameterStore, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let account = fetch_secret(store, "account", get("SNOWFLAKE_ACCOUNT")).await;
        let user = fetch_secret(store, "user", get("SNOWFLAKE_USER")).await;
        let password = fetch_secret(store, "password", get("SNOWFLAKE_PASSWORD")).await;

        Self {
            account,
            user,
            password: Secret::new(password),
            warehouse: fetch_or_default(store, "warehouse", DEFAULT_WAREHOUSE).await,
            database: fetch_or_default(store, "database", DEFAULT_DATABASE).await,
            schema: fetch_or_default(store, "schema", DEFAULT_SCHEMA).await,
            role: fetch_or_default(store, "role", DEFAULT_ROLE).await,
            host: fetch_host(store, get("SNOWFLAKE_HOST")).await,
            pool_size: WAREHOUSE_POOL_SIZE,
            query_timeout: query_timeout(get("SNOWFLAKE_QUERY_TIMEOUT_SECS")),
        }
    }
}

/// Unparsable values fall back to the default
fn query_timeout(raw: Option<String>) -> Duration {
    match raw {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                tracing::warn!(
                    "Invalid SNOWFLAKE_QUERY_TIMEOUT_SECS {:?}; using {}s",
                    raw,
                    DEFAULT_QUERY_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS)
            }
        },
        None => Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
    }
}

async fn fetch_secret(store: &dyn ParameterStore, key: &str, fallback: Option<String>) -> String {
    let name = format!("{}{}", PARAMETER_PREFIX, key);
    match store.get_parameter(&name, true).await {
        Ok(value) if !value.is_empty() => value,
        Ok(_) => {
            tracing::error!("Parameter {} is empty", name);
            fallback.unwrap_or_default()
        }
        Err(err) => {
            tracing::error!("{}", err);
            fallback.unwrap_or_default()
        }
    }
}

async fn fetch_or_default(store: &dyn ParameterStore, key: &str, default: &str) -> String {
    let name = format!("{}{}", PARAMETER_PREFIX, key);
    match store.get_parameter(&name, false).await {
        Ok(value) if !value.is_empty() => value,
        Ok(_) => default.to_string(),
        Err(err) => {
            tracing::warn!("{}; using default {}", err, default);
            default.to_string()
        }
    }
}

/// Optional endpoint override; absent in most deployments, so a miss is not logged as a failure
async fn fetch_host(store: &dyn ParameterStore, fallback: Option<String>) -> Option<String> {
    let name = format!("{}host", PARAMETER_PREFIX);
    match store.get_parameter(&name, false).await {
        Ok(value) if !value.is_empty() => Some(value),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!("{}", err);
            fallback
        }
    }
}
