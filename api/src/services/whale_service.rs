// Whale notification business logic

use crate::error::ApiResult;
use crate::handlers::AppState;
use crate::models::{TokenStat, WhaleNotification};

/// Newest-first notifications, at most `limit`, optionally for one symbol
pub async fn get_whale_notifications(
    state: &AppState,
    limit: u32,
    symbol: Option<&str>,
) -> ApiResult<Vec<WhaleNotification>> {
    let notifications = state
        .repositories
        .whale_notifications
        .list(limit, symbol)
        .await
        .map_err(|err| {
            tracing::error!("Error fetching whale notifications: {}", err);
            err
        })?;

    tracing::debug!(
        "Fetched {} whale notifications (limit {}, symbol {:?})",
        notifications.len(),
        limit,
        symbol
    );
    Ok(notifications)
}

/// Aggregate statistics for every token, highest net buying first
pub async fn get_token_stats(state: &AppState) -> ApiResult<Vec<TokenStat>> {
    let stats = state
        .repositories
        .whale_notifications
        .token_stats()
        .await
        .map_err(|err| {
            tracing::error!("Error fetching token stats: {}", err);
            err
        })?;

    Ok(stats)
}
