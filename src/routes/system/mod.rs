mod handler;

pub use handler::{HealthResponse, LimitsResponse, health, limits};
