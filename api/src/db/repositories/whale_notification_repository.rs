// Repository for the whale notifications table
use crate::db::{Binding, DbError, DbPool, Statement};
use crate::entity::{token_stats, whale_notifications};

/// Fully-qualified table every query reads from
pub const NOTIFICATIONS_TABLE: &str = "DEV.BRONZE.WHALE_NOTIFICATIONS";

const SELECT_NOTIFICATIONS: &str = "
    SELECT
        NOTIFICATION_ID, TIMESTAMP, ADDRESS, SYMBOL, NAME,
        TIME_INTERVAL, NUM_USERS_BOUGHT, NUM_USERS_SOLD, INSERTED_AT
    FROM DEV.BRONZE.WHALE_NOTIFICATIONS";

// Totals are coalesced so NET_ACTIVITY is exactly TOTAL_BUYS - TOTAL_SELLS even with NULL counts
const SELECT_TOKEN_STATS: &str = "
    SELECT
        SYMBOL,
        NAME,
        COUNT(*) AS NOTIFICATION_COUNT,
        COALESCE(SUM(NUM_USERS_BOUGHT), 0) AS TOTAL_BUYS,
        COALESCE(SUM(NUM_USERS_SOLD), 0) AS TOTAL_SELLS,
        COALESCE(SUM(NUM_USERS_BOUGHT), 0) - COALESCE(SUM(NUM_USERS_SOLD), 0) AS NET_ACTIVITY,
        MAX(TIMESTAMP) AS LATEST_ACTIVITY
    FROM DEV.BRONZE.WHALE_NOTIFICATIONS
    GROUP BY SYMBOL, NAME
    ORDER BY NET_ACTIVITY DESC";

pub struct WhaleNotificationRepository {
    pool: DbPool,
}

impl WhaleNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Builds the listing statement. `symbol` is always bound, never spliced into the SQL.
    pub fn list_statement(limit: u32, symbol: Option<&str>) -> Statement {
        let limit = Binding::Fixed(i64::from(limit));
        match symbol.filter(|s| !s.is_empty()) {
            Some(symbol) => Statement::from_sql_and_values(
                format!(
                    "{} WHERE SYMBOL = ? ORDER BY TIMESTAMP DESC LIMIT ?",
                    SELECT_NOTIFICATIONS
                ),
                vec![Binding::Text(symbol.to_string()), limit],
            ),
            None => Statement::from_sql_and_values(
                format!("{} ORDER BY TIMESTAMP DESC LIMIT ?", SELECT_NOTIFICATIONS),
                vec![limit],
            ),
        }
    }

    /// Newest notifications first, optionally restricted to one symbol
    pub async fn list(
        &self,
        limit: u32,
        symbol: Option<&str>,
    ) -> Result<Vec<whale_notifications::Model>, DbError> {
        let results = self
            .pool
            .execute(&Self::list_statement(limit, symbol))
            .await?;
        results
            .rows()
            .map(|row| whale_notifications::Model::from_row(&row))
            .collect()
    }

    /// Per-token aggregates ordered by net buying pressure
    pub async fn token_stats(&self) -> Result<Vec<token_stats::Model>, DbError> {
        let results = self
            .pool
            .execute(&Statement::from_string(SELECT_TOKEN_STATS))
            .await?;
        results
            .rows()
            .map(|row| token_stats::Model::from_row(&row))
            .collect()
    }

    /// Live connectivity check
    pub async fn current_warehouse(&self) -> Result<Option<String>, DbError> {
        let results = self
            .pool
            .execute(&Statement::from_string("SELECT CURRENT_WAREHOUSE()"))
            .await?;
        let value = match results.rows().next() {
            Some(row) => row.try_get_by_index::<Option<String>>(0),
            None => Ok(None),
        };
        value
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_filter_is_bound() {
        let statement = WhaleNotificationRepository::list_statement(2, Some("O' OR '1'='1"));
        assert!(!statement.sql.contains("O'"));
        assert!(statement.sql.contains("WHERE SYMBOL = ?"));
        assert!(statement.sql.contains(NOTIFICATIONS_TABLE));
        assert_eq!(
            statement.bindings,
            vec![Binding::Text("O' OR '1'='1".to_string()), Binding::Fixed(2)]
        );
    }

    #[test]
    fn empty_symbol_means_no_filter() {
        let statement = WhaleNotificationRepository::list_statement(100, Some(""));
        assert!(!statement.sql.contains("WHERE"));
        assert!(statement.sql.ends_with("ORDER BY TIMESTAMP DESC LIMIT ?"));
        assert_eq!(statement.bindings, vec![Binding::Fixed(100)]);
    }
}
