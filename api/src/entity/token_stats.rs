// Token stats entity - per-token aggregate over whale notifications, never stored
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::{DbError, Row};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Model {
    pub symbol: String,
    pub name: String,
    pub notification_count: i64,
    pub total_buys: i64,
    pub total_sells: i64,
    /// TOTAL_BUYS - TOTAL_SELLS
    pub net_activity: i64,
    pub latest_activity: Option<NaiveDateTime>,
}

impl Model {
    pub fn from_row(row: &Row<'_>) -> Result<Self, DbError> {
        Ok(Self {
            symbol: row.try_get("SYMBOL")?,
            name: row.try_get("NAME")?,
            notification_count: row.try_get("NOTIFICATION_COUNT")?,
            total_buys: row.try_get("TOTAL_BUYS")?,
            total_sells: row.try_get("TOTAL_SELLS")?,
            net_activity: row.try_get("NET_ACTIVITY")?,
            latest_activity: row.try_get("LATEST_ACTIVITY")?,
        })
    }
}
