/// 缓存操作
/// 内存缓存与限流器的实现

pub mod rate_limit;
pub mod ttl_cache;

pub use rate_limit::RateLimiter;
pub use ttl_cache::TtlCache;
