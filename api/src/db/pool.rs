// Warehouse session pooling

use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::WarehouseConfig;
use crate::db::client::{Session, SnowflakeClient, Statement};
use crate::db::error::DbError;
use crate::db::repositories::Repositories;
use crate::db::row::ResultSet;

struct PoolInner {
    client: SnowflakeClient,
    idle: Mutex<Vec<Session>>,
    permits: Arc<Semaphore>,
    size: usize,
}

/// Process-wide pool of Snowflake sessions.
///
/// At most `pool_size` sessions exist at once; checkouts beyond that wait for
/// a session to come back rather than opening extra ones.
#[derive(Clone)]
pub struct DbPool {
    inner: Arc<PoolInner>,
}

impl DbPool {
    /// Creates the pool; sessions are opened lazily on first checkout
    pub fn new(config: &WarehouseConfig) -> Result<Self, DbError> {
        let client = SnowflakeClient::new(config)?;
        let size = config.pool_size.max(1);
        tracing::info!(
            "Warehouse pool ready for {} (max {} sessions)",
            config.redacted_connection_string(),
            size
        );

        Ok(DbPool {
            inner: Arc::new(PoolInner {
                client,
                idle: Mutex::new(Vec::with_capacity(size)),
                permits: Arc::new(Semaphore::new(size)),
                size,
            }),
        })
    }

    pub fn max_size(&self) -> usize {
        self.inner.size
    }

    /// Number of sessions that can be checked out right now without waiting
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }

    pub fn config(&self) -> &WarehouseConfig {
        self.inner.client.config()
    }

    /// Checks out a session, reusing an idle one that is still valid or logging in a new one
    pub async fn get(&self) -> Result<PooledSession, DbError> {
        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|_| DbError::connection("Warehouse pool is closed"))?;

        let (session, reused) = match self.pop_valid() {
            Some(session) => (session, true),
            None => (self.inner.client.login().await?, false),
        };

        Ok(PooledSession {
            session: Some(session),
            pool: Arc::clone(&self.inner),
            broken: false,
            reused,
            _permit: permit,
        })
    }

    fn pop_valid(&self) -> Option<Session> {
        let mut idle = self.inner.idle.lock().ok()?;
        while let Some(session) = idle.pop() {
            if !session.is_expired() {
                return Some(session);
            }
            tracing::debug!("Dropping idle warehouse session past its validity");
        }
        None
    }

    /// Runs one statement on a pooled session.
    ///
    /// A reused session whose token the warehouse no longer accepts is replaced
    /// by a fresh login and the statement is sent once more; it never ran.
    pub async fn execute(&self, statement: &Statement) -> Result<ResultSet, DbError> {
        let mut session = self.get().await?;
        let mut result = session.execute(statement).await;
        if session.reused && matches!(result, Err(DbError::SessionExpired { .. })) {
            tracing::info!("Pooled warehouse session expired; logging in again");
            session.renew().await?;
            result = session.execute(statement).await;
        }
        if let Err(err) = &result {
            if err.invalidates_session() {
                session.discard();
            }
        }
        result
    }

    /// Closes the pool and logs out of every idle session
    pub async fn close(&self) {
        self.inner.permits.close();
        let sessions: Vec<Session> = match self.inner.idle.lock() {
            Ok(mut idle) => idle.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        let count = sessions.len();
        for session in sessions {
            self.inner.client.close(session).await;
        }
        tracing::info!("Warehouse pool closed ({} sessions logged out)", count);
    }

    /// Creates repository instances for warehouse operations
    pub fn repositories(&self) -> Repositories {
        Repositories::new(self.clone())
    }
}

/// A checked-out session, returned to the pool on drop
pub struct PooledSession {
    session: Option<Session>,
    pool: Arc<PoolInner>,
    broken: bool,
    reused: bool,
    _permit: OwnedSemaphorePermit,
}

impl PooledSession {
    pub async fn execute(&mut self, statement: &Statement) -> Result<ResultSet, DbError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| DbError::connection("Session already released"))?;
        self.pool.client.execute(session, statement).await
    }

    /// Replaces the session with a fresh login under the same permit
    async fn renew(&mut self) -> Result<(), DbError> {
        self.session = None;
        self.session = Some(self.pool.client.login().await?);
        self.reused = false;
        Ok(())
    }

    /// Drops the session instead of returning it; the permit is still released
    pub fn discard(&mut self) {
        self.broken = true;
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        if self.broken || self.pool.permits.is_closed() {
            return;
        }
        if let Some(session) = self.session.take() {
            if let Ok(mut idle) = self.pool.idle.lock() {
                idle.push(session);
            }
        }
    }
}
