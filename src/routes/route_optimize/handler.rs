use axum::extract::{Json, State};
use serde_json::Value;

use crate::AppState;
use crate::error::{AppError, AppResult};

use super::model::{RouteOptimizeRequest, optimize};

#[axum::debug_handler]
pub async fn optimize_route(
    State(state): State<AppState>,
    Json(req): Json<RouteOptimizeRequest>,
) -> AppResult<Json<Value>> {
    req.validate()?;
    let key = req.cache_key();

    let result = state
        .cache
        .get_or_compute(&key, state.config.route_cache_ttl(), || async move {
            let route = optimize(&req.stops, req.start(), req.round_trip);
            tracing::debug!(stops = route.order.len(), total_km = route.total_distance_km, "route optimized");
            Ok::<_, AppError>(serde_json::to_value(route)?)
        })
        .await?;

    Ok(Json(result.into_payload()))
}
