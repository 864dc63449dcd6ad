mod handler;
mod model;

pub use handler::optimize_route;
pub use model::{Leg, OptimizedRoute, RouteOptimizeRequest, Stop, optimize};
