use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::cache::models::rate_limit::retry_after_secs;
use crate::cache::models::{RateLimitExceeded, RateLimitStatus, RateWindowEntry};
use crate::clock::{SharedClock, duration_millis};
use crate::config::RateLimitPolicy;

/// 按标识符计数的固定窗口限流器
///
/// 窗口边界处最多可能放行 `2 × max_requests` 次请求，这是固定窗口算法
/// 的已知行为。
pub struct RateLimiter {
    name: &'static str,
    max_requests: u32,
    window: Duration,
    clock: SharedClock,
    entries: Mutex<HashMap<String, RateWindowEntry>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, policy: RateLimitPolicy, clock: SharedClock) -> Self {
        Self {
            name,
            max_requests: policy.max_requests,
            window: policy.window(),
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateWindowEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 记录一次请求并判断是否放行
    ///
    /// 被拒绝的请求不计数。
    pub fn check(&self, identifier: &str) -> Result<RateLimitStatus, RateLimitExceeded> {
        let now = self.clock.now_millis();
        let mut entries = self.lock();

        match entries.get_mut(identifier) {
            Some(entry) if !entry.is_expired(now) => {
                if entry.count < self.max_requests {
                    entry.count += 1;
                    Ok(self.status(entry))
                } else {
                    Err(RateLimitExceeded {
                        limiter: self.name,
                        retry_after_secs: retry_after_secs(entry.reset_at, now),
                        reset_at: entry.reset_at,
                    })
                }
            }
            _ => {
                let entry = RateWindowEntry::open(now, self.window);
                entries.insert(identifier.to_string(), entry);
                Ok(self.status(&entry))
            }
        }
    }

    pub fn is_allowed(&self, identifier: &str) -> bool {
        self.check(identifier).is_ok()
    }

    /// 当前窗口剩余次数；没有活动窗口时为上限
    pub fn remaining(&self, identifier: &str) -> u32 {
        let now = self.clock.now_millis();
        match self.active_entry(identifier, now) {
            Some(entry) => self.max_requests.saturating_sub(entry.count),
            None => self.max_requests,
        }
    }

    /// 当前窗口的重置时间（Unix 毫秒）；没有活动窗口时为 `now + window`
    pub fn reset_time(&self, identifier: &str) -> i64 {
        let now = self.clock.now_millis();
        match self.active_entry(identifier, now) {
            Some(entry) => entry.reset_at,
            None => now.saturating_add(duration_millis(self.window)),
        }
    }

    pub fn retry_after_secs(&self, identifier: &str) -> u64 {
        retry_after_secs(self.reset_time(identifier), self.clock.now_millis())
    }

    /// 不计数地读取当前状态
    pub fn snapshot(&self, identifier: &str) -> RateLimitStatus {
        RateLimitStatus {
            limit: self.max_requests,
            remaining: self.remaining(identifier),
            reset_at: self.reset_time(identifier),
        }
    }

    /// 删除所有已过期窗口，返回删除数量
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    pub fn reset(&self, identifier: &str) {
        self.lock().remove(identifier);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn active_entry(&self, identifier: &str, now: i64) -> Option<RateWindowEntry> {
        self.lock()
            .get(identifier)
            .filter(|entry| !entry.is_expired(now))
            .copied()
    }

    fn status(&self, entry: &RateWindowEntry) -> RateLimitStatus {
        RateLimitStatus {
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_at: entry.reset_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const START: i64 = 1_700_000_000_000;

    fn limiter(max_requests: u32, window_ms: u64) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::new(START);
        let policy = RateLimitPolicy::new(max_requests, Duration::from_millis(window_ms));
        (RateLimiter::new("test", policy, clock.shared()), clock)
    }

    #[test]
    fn allows_up_to_max_then_denies() {
        let (limiter, _) = limiter(5, 60_000);
        for i in 0..5 {
            assert!(limiter.is_allowed("x"), "request {} should pass", i + 1);
        }
        assert!(!limiter.is_allowed("x"));
        assert_eq!(limiter.remaining("x"), 0);
    }

    #[test]
    fn two_per_second_scenario() {
        let (limiter, clock) = limiter(2, 1_000);
        assert!(limiter.is_allowed("x"));
        assert!(limiter.is_allowed("x"));
        assert!(!limiter.is_allowed("x"));

        clock.advance(Duration::from_millis(1_001));
        assert!(limiter.is_allowed("x"));
        assert_eq!(limiter.remaining("x"), 1);
    }

    #[test]
    fn window_reset_restores_quota() {
        let (limiter, clock) = limiter(3, 1_000);
        for _ in 0..4 {
            limiter.is_allowed("x");
        }
        clock.advance(Duration::from_millis(1_001));
        assert!(limiter.is_allowed("x"));
        assert_eq!(limiter.remaining("x"), 2);
        assert_eq!(limiter.reset_time("x"), START + 1_001 + 1_000);
    }

    #[test]
    fn window_is_still_active_at_reset_instant() {
        let (limiter, clock) = limiter(1, 1_000);
        assert!(limiter.is_allowed("x"));
        clock.advance(Duration::from_millis(1_000));
        assert!(!limiter.is_allowed("x"));
    }

    #[test]
    fn identifiers_are_independent() {
        let (limiter, _) = limiter(1, 60_000);
        assert!(limiter.is_allowed("a"));
        assert!(!limiter.is_allowed("a"));
        assert!(limiter.is_allowed("b"));
    }

    #[test]
    fn unknown_identifier_reports_full_quota() {
        let (limiter, _) = limiter(10, 60_000);
        assert_eq!(limiter.remaining("nobody"), 10);
        assert_eq!(limiter.reset_time("nobody"), START + 60_000);
        assert!(limiter.is_empty(), "reads never create windows");
    }

    #[test]
    fn rejection_carries_retry_after() {
        let (limiter, clock) = limiter(1, 10_000);
        limiter.check("x").unwrap();
        clock.advance(Duration::from_millis(2_500));

        let exceeded = limiter.check("x").unwrap_err();
        assert_eq!(exceeded.limiter, "test");
        assert_eq!(exceeded.retry_after_secs, 8);
        assert_eq!(exceeded.reset_at, START + 10_000);
        assert_eq!(limiter.retry_after_secs("x"), 8);
    }

    #[test]
    fn denied_requests_do_not_extend_window() {
        let (limiter, clock) = limiter(1, 1_000);
        limiter.check("x").unwrap();
        for _ in 0..5 {
            clock.advance(Duration::from_millis(100));
            assert!(limiter.check("x").is_err());
        }
        assert_eq!(limiter.reset_time("x"), START + 1_000);
    }

    #[test]
    fn check_reports_remaining() {
        let (limiter, _) = limiter(3, 1_000);
        assert_eq!(limiter.check("x").unwrap().remaining, 2);
        assert_eq!(limiter.check("x").unwrap().remaining, 1);
        let status = limiter.check("x").unwrap();
        assert_eq!(status.remaining, 0);
        assert_eq!(status.limit, 3);
        assert_eq!(limiter.snapshot("x"), status);
    }

    #[test]
    fn cleanup_drops_expired_windows() {
        let (limiter, clock) = limiter(5, 1_000);
        limiter.is_allowed("old");
        clock.advance(Duration::from_millis(600));
        limiter.is_allowed("new");
        clock.advance(Duration::from_millis(500));

        assert_eq!(limiter.cleanup(), 1);
        assert_eq!(limiter.len(), 1);
        assert_eq!(limiter.remaining("new"), 4);
    }

    #[test]
    fn reset_and_clear_forget_windows() {
        let (limiter, _) = limiter(1, 60_000);
        limiter.is_allowed("a");
        limiter.is_allowed("b");
        limiter.reset("a");
        assert!(limiter.is_allowed("a"));
        limiter.clear();
        assert!(limiter.is_empty());
    }
}
