mod handler;
mod model;

pub use handler::traffic_advisory;
pub use model::{CongestionLevel, TrafficAdvisory, TrafficEstimator, TrafficQuery, TravelMode};
