mod handler;
mod model;

pub use handler::plan_trip;
pub use model::{
    Activity, Budget, DayPlan, Itinerary, PlannerError, TemplatePlanner, TripPlanQuery,
    TripPlanRequest, TripPlanner,
};
