// Warehouse access layer for the Solana Traders API

pub mod client;
pub mod error;
pub mod pool;
pub mod repositories;
pub mod row;

pub use client::{Binding, SnowflakeClient, Statement};
pub use error::DbError;
pub use pool::{DbPool, PooledSession};
pub use repositories::Repositories;
pub use row::{ResultSet, Row};
