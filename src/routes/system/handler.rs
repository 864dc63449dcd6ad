use std::collections::BTreeMap;

use axum::extract::{Json, State};
use axum::http::HeaderMap;
use serde::Serialize;

use crate::AppState;
use crate::cache::{CacheStats, RateLimitStatus};
use crate::utils::client_identifier;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache_entries: usize,
    pub cache_capacity: usize,
    pub cache_stats: CacheStats,
    pub hit_ratio: f64,
}

#[derive(Debug, Serialize)]
pub struct LimitsResponse {
    pub client: String,
    pub limits: BTreeMap<&'static str, RateLimitStatus>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.cache.stats();
    Json(HealthResponse {
        status: "ok",
        cache_entries: state.cache.len(),
        cache_capacity: state.cache.max_entries(),
        cache_stats: stats,
        hit_ratio: stats.hit_ratio(),
    })
}

/// 查看调用方在各限流器下的剩余额度，不消耗 auth/ai 额度
pub async fn limits(State(state): State<AppState>, headers: HeaderMap) -> Json<LimitsResponse> {
    let client = client_identifier(&headers);
    let limits = state
        .limiters
        .all()
        .into_iter()
        .map(|limiter| (limiter.name(), limiter.snapshot(&client)))
        .collect();

    Json(LimitsResponse { client, limits })
}
