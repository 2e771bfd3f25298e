// API endpoint handlers

pub mod diagnostic;
pub mod health;
pub mod token_stats;
pub mod whale_notifications;

pub use diagnostic::debug_info;
pub use health::health_check;
pub use token_stats::get_token_stats;
pub use whale_notifications::get_whale_notifications;

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::{DbError, DbPool, Repositories};

/// Everything a request needs, built once per process (or per function invocation)
pub struct AppContext {
    pub repositories: Repositories,
    pub config: ApiConfig,
}

impl AppContext {
    pub fn new(config: ApiConfig) -> Result<Self, DbError> {
        let pool = DbPool::new(&config.warehouse)?;
        Ok(Self {
            repositories: pool.repositories(),
            config,
        })
    }

    pub fn pool(&self) -> &DbPool {
        self.repositories.whale_notifications.pool()
    }
}

// Type alias for the application state
pub type AppState = Arc<AppContext>;
