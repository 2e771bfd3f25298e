//! Entity module for warehouse records

pub mod token_stats;
pub mod whale_notifications;
