// Business logic service implementations

pub mod diagnostic;
pub mod health;
pub mod whale_service;
