use axum::extract::{Json, Query, State};
use serde_json::Value;

use crate::AppState;
use crate::error::{AppError, AppResult};

use super::model::TrafficQuery;

#[axum::debug_handler]
pub async fn traffic_advisory(
    State(state): State<AppState>,
    Query(query): Query<TrafficQuery>,
) -> AppResult<Json<Value>> {
    query.validate()?;
    let hour = query.hour_at(state.clock.now_millis());
    let key = query.cache_key(hour);
    let estimator = state.traffic.clone();

    let result = state
        .cache
        .get_or_compute(&key, state.config.traffic_cache_ttl(), || async move {
            let advisory =
                estimator.estimate(&query.origin(), &query.destination(), query.mode, hour);
            Ok::<_, AppError>(serde_json::to_value(advisory)?)
        })
        .await?;

    Ok(Json(result.into_payload()))
}
