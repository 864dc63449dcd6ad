use axum::extract::{Json, State};
use serde_json::Value;

use crate::AppState;
use crate::error::{AppError, AppResult};

use super::model::TripPlanRequest;

#[axum::debug_handler]
pub async fn plan_trip(
    State(state): State<AppState>,
    Json(req): Json<TripPlanRequest>,
) -> AppResult<Json<Value>> {
    let query = req.validate()?;
    let key = query.cache_key();
    let planner = state.planner.clone();

    let result = state
        .cache
        .get_or_compute(&key, state.config.trip_plan_cache_ttl(), || async move {
            tracing::info!(destination = %query.destination, days = query.days, "generating trip plan");
            let itinerary = planner.plan(&query).await?;
            Ok::<_, AppError>(serde_json::to_value(itinerary)?)
        })
        .await?;

    Ok(Json(result.into_payload()))
}
