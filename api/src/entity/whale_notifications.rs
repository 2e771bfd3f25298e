// Whale notification entity - one row of DEV.BRONZE.WHALE_NOTIFICATIONS
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::{DbError, Row};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Model {
    pub notification_id: i64,
    pub timestamp: NaiveDateTime,
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub time_interval: String,
    pub num_users_bought: i64,
    pub num_users_sold: i64,
    pub inserted_at: NaiveDateTime,
}

impl Model {
    pub fn from_row(row: &Row<'_>) -> Result<Self, DbError> {
        Ok(Self {
            notification_id: row.try_get("NOTIFICATION_ID")?,
            timestamp: row.try_get("TIMESTAMP")?,
            address: row.try_get("ADDRESS")?,
            symbol: row.try_get("SYMBOL")?,
            name: row.try_get("NAME")?,
            time_interval: row.try_get("TIME_INTERVAL")?,
            num_users_bought: row.try_get("NUM_USERS_BOUGHT")?,
            num_users_sold: row.try_get("NUM_USERS_SOLD")?,
            inserted_at: row.try_get("INSERTED_AT")?,
        })
    }
}
