/// 行程规划缓存前缀
pub const TRIP_PLAN: &str = "trip-plan";

/// 路线优化缓存前缀
pub const ROUTE_OPTIMIZE: &str = "route-optimize";

/// 路况缓存前缀
pub const TRAFFIC: &str = "traffic";
