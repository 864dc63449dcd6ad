pub mod route_optimize;
pub mod system;
pub mod traffic;
pub mod trip;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::middleware::{log_errors, rate_limit};

/// 组装全部路由
///
/// 行程生成走 `ai` 限流，其余接口走 `api` 限流，健康检查不限流。
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/route-optimize", post(route_optimize::optimize_route))
        .route("/traffic", get(traffic::traffic_advisory))
        .route("/limits", get(system::limits))
        .layer(from_fn_with_state(state.limiters.api.clone(), rate_limit));

    let ai_routes = Router::new()
        .route("/trip-plan", post(trip::plan_trip))
        .layer(from_fn_with_state(state.limiters.ai.clone(), rate_limit));

    let public_routes = Router::new().route("/health", get(system::health));

    let routes = Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ai_routes);

    // axum 不支持在根路径 nest
    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        routes
    } else {
        Router::new().nest(base, routes)
    };

    router
        .layer(from_fn(log_errors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 为外部提供的认证路由加上 `auth` 限流
pub fn with_auth_limit(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router.layer(from_fn_with_state(state.limiters.auth.clone(), rate_limit))
}
