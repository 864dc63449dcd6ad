// 缓存模块
// 包含进程内缓存、限流器及其后台清扫任务

pub mod keys;
pub mod models;
pub mod operations;
pub mod sweeper;

use std::sync::Arc;

use serde_json::Value;

use crate::clock::SharedClock;
use crate::config::Config;

// 重新导出常用类型，方便其他模块使用
pub use keys::{create_cache_key, object_params};
pub use models::{CacheStats, Cached, RateLimitExceeded, RateLimitStatus};
pub use operations::{RateLimiter, TtlCache};
pub use sweeper::{Sweep, Sweeper};

/// 响应缓存，各功能通过键前缀区分
pub type ResponseCache = TtlCache<Value>;

/// 按用途划分的限流器，参数互相独立
#[derive(Clone)]
pub struct Limiters {
    pub api: Arc<RateLimiter>,
    pub auth: Arc<RateLimiter>,
    pub ai: Arc<RateLimiter>,
}

impl Limiters {
    pub fn from_config(config: &Config, clock: &SharedClock) -> Self {
        Self {
            api: Arc::new(RateLimiter::new("api", config.api_rate_limit, clock.clone())),
            auth: Arc::new(RateLimiter::new("auth", config.auth_rate_limit, clock.clone())),
            ai: Arc::new(RateLimiter::new("ai", config.ai_rate_limit, clock.clone())),
        }
    }

    pub fn all(&self) -> [&Arc<RateLimiter>; 3] {
        [&self.api, &self.auth, &self.ai]
    }

    /// 测试用：清空所有限流状态
    pub fn clear(&self) {
        for limiter in self.all() {
            limiter.clear();
        }
    }
}
