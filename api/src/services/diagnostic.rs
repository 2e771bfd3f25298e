// Warehouse diagnostic service implementation

use chrono::Local;
use serde_json::{json, Value};

use crate::config::{ApiConfig, WarehouseConfig};
use crate::db::repositories::{WhaleNotificationRepository, NOTIFICATIONS_TABLE};
use crate::models::{CorsSettings, DebugResponse};
use crate::routes::ALLOWED_METHODS;

/// Service for configuration and connectivity diagnostics
pub struct DiagnosticService<'a> {
    repository: &'a WhaleNotificationRepository,
    config: &'a ApiConfig,
}

impl<'a> DiagnosticService<'a> {
    /// Creates a new diagnostic service over the live repository and configuration
    pub fn new(repository: &'a WhaleNotificationRepository, config: &'a ApiConfig) -> Self {
        Self { repository, config }
    }

    /// Collects masked configuration, a live connectivity check and the CORS policy
    pub async fn diagnose(&self) -> DebugResponse {
        DebugResponse {
            timestamp: Local::now().naive_local(),
            environment: masked_environment(&self.config.warehouse),
            connection_status: self.connection_status().await,
            cors_settings: cors_settings(self.config),
        }
    }

    async fn connection_status(&self) -> String {
        match self.repository.current_warehouse().await {
            Ok(Some(warehouse)) => format!("Connected to warehouse: {}", warehouse),
            Ok(None) => "Connected to warehouse: (none selected)".to_string(),
            Err(e) => {
                tracing::warn!("Diagnostic connectivity check failed: {}", e);
                format!("Connection failed: {}", e)
            }
        }
    }
}

/// Configuration with credentials masked
pub fn masked_environment(config: &WarehouseConfig) -> Value {
    json!({
        "SNOWFLAKE_ACCOUNT": config.account,
        "SNOWFLAKE_USER": mask(&config.user),
        "SNOWFLAKE_PASSWORD": if config.password.is_empty() { "Not set" } else { "******" },
        "SNOWFLAKE_WAREHOUSE": config.warehouse,
        "SNOWFLAKE_DATABASE": config.database,
        "SNOWFLAKE_SCHEMA": config.schema,
        "SNOWFLAKE_ROLE": config.role,
        "CONNECTION": config.redacted_connection_string(),
        "TABLE": NOTIFICATIONS_TABLE,
        "POOL_SIZE": config.pool_size,
    })
}

pub fn cors_settings(config: &ApiConfig) -> CorsSettings {
    CorsSettings {
        allow_origins: config.cors_origins.clone(),
        allow_methods: ALLOWED_METHODS.iter().map(|m| m.to_string()).collect(),
        allow_credentials: true,
    }
}

/// Keeps the first two characters
fn mask(value: &str) -> String {
    if value.is_empty() {
        return "Not set".to_string();
    }
    let visible: String = value.chars().take(2).collect();
    format!("{}*****", visible)
}
