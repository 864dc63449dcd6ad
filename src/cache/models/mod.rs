/// 缓存与限流的数据模型
pub mod entry;
pub mod rate_limit;

pub use entry::{CacheEntry, CacheStats, Cached};
pub use rate_limit::{RateLimitExceeded, RateLimitStatus, RateWindowEntry};
