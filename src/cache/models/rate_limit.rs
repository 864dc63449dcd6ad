use serde::Serialize;

use crate::clock::duration_millis;

/// 固定窗口计数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindowEntry {
    pub count: u32,
    pub reset_at: i64, // Unix 毫秒
}

impl RateWindowEntry {
    /// 以一次请求开启新窗口
    pub fn open(now: i64, window: std::time::Duration) -> Self {
        Self {
            count: 1,
            reset_at: now.saturating_add(duration_millis(window)),
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.reset_at
    }
}

/// 放行时的限流状态
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: i64,
}

impl RateLimitStatus {
    pub fn reset_at_secs(&self) -> i64 {
        self.reset_at.div_euclid(1000)
    }
}

/// 超出限流，携带重试等待时间
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rate limit `{limiter}` exceeded, retry after {retry_after_secs}s")]
pub struct RateLimitExceeded {
    pub limiter: &'static str,
    pub retry_after_secs: u64,
    pub reset_at: i64,
}

/// 距离重置的秒数，向上取整，至少 1 秒
pub fn retry_after_secs(reset_at: i64, now: i64) -> u64 {
    let millis = reset_at.saturating_sub(now).max(0) as u64;
    millis.div_ceil(1000).max(1)
}
