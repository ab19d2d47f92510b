pub mod distance;
pub mod health;
pub mod locations;
pub mod metrics;
