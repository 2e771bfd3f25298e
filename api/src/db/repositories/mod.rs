// Warehouse repository management

mod whale_notification_repository;

pub use whale_notification_repository::{WhaleNotificationRepository, NOTIFICATIONS_TABLE};

use crate::db::DbPool;

/// Container for all warehouse repositories
pub struct Repositories {
    pub whale_notifications: WhaleNotificationRepository,
}

impl Repositories {
    /// Creates a new repositories container with the warehouse pool
    pub fn new(pool: DbPool) -> Self {
        Repositories {
            whale_notifications: WhaleNotificationRepository::new(pool),
        }
    }
}
