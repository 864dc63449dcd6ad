use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::cache::models::{CacheEntry, CacheStats, Cached};
use crate::clock::SharedClock;

struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    // 插入序号 -> 键，最小序号即最早插入
    order: BTreeMap<u64, String>,
    next_seq: u64,
    stats: CacheStats,
}

impl<V> Inner<V> {
    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        self.stats.evictions += 1;
        Some(key)
    }
}

/// 带过期时间和容量上限的内存缓存
///
/// 容量满时按插入顺序淘汰最早的条目（不是 LRU）；过期条目在读取时
/// 视为不存在并顺手删除，其余由 [`TtlCache::cleanup`] 定期清扫。
pub struct TtlCache<V> {
    name: &'static str,
    max_entries: usize,
    default_ttl: Duration,
    clock: SharedClock,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(
        name: &'static str,
        max_entries: usize,
        default_ttl: Duration,
        clock: SharedClock,
    ) -> Self {
        Self {
            name,
            max_entries: max_entries.max(1),
            default_ttl,
            clock,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                next_seq: 0,
                stats: CacheStats::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        // 所有操作在持锁期间不会 panic 到一半，中毒后直接沿用内部数据
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// 写入或覆盖；覆盖保留原插入位置
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        let now = self.clock.now_millis();
        let mut inner = self.lock();

        if let Some(entry) = inner.entries.get_mut(key) {
            entry.data = value;
            entry.stored_at = now;
            entry.ttl = ttl;
            return;
        }

        if inner.entries.len() >= self.max_entries {
            if let Some(evicted) = inner.evict_oldest() {
                tracing::debug!(cache = self.name, key = %evicted, "evicted oldest cache entry");
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.to_string());
        inner
            .entries
            .insert(key.to_string(), CacheEntry::new(value, now, ttl, seq));
    }

    pub fn set_default(&self, key: &str, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// 读取未过期的值；过期条目会被删除
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_millis();
        let mut guard = self.lock();
        let inner = &mut *guard;

        let expired = match inner.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                let data = entry.data.clone();
                inner.stats.hits += 1;
                return Some(data);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.remove(key);
            inner.stats.expirations += 1;
        }
        inner.stats.misses += 1;
        None
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn delete(&self, key: &str) {
        self.lock().remove(key);
    }

    /// 删除所有过期条目，返回删除数量
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_millis();
        let mut inner = self.lock();

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.remove(key);
        }
        inner.stats.expirations += expired.len() as u64;
        expired.len()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// 当前条目数，包含尚未清扫的过期条目
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// 命中则直接返回，否则执行 `compute` 并在成功时写入缓存
    ///
    /// 计算期间不持有锁；失败结果不会被缓存。
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Cached<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            tracing::debug!(cache = self.name, key, "cache hit");
            return Ok(Cached::hit(value));
        }

        let value = compute().await?;
        self.set(key, value.clone(), ttl);
        Ok(Cached::miss(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const TTL: Duration = Duration::from_secs(60);

    fn cache(max: usize) -> (TtlCache<i32>, ManualClock) {
        let clock = ManualClock::new(1_700_000_000_000);
        (TtlCache::new("test", max, TTL, clock.shared()), clock)
    }

    #[test]
    fn set_then_get_returns_value() {
        let (cache, _) = cache(10);
        cache.set("k", 7, TTL);
        assert_eq!(cache.get("k"), Some(7));
        assert!(cache.has("k"));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let (cache, clock) = cache(10);
        cache.set("k", 7, Duration::from_millis(1_000));

        clock.advance(Duration::from_millis(1_000));
        assert_eq!(cache.get("k"), Some(7));

        clock.advance(Duration::from_millis(1));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0, "stale entry is purged on read");
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn has_purges_stale_entry() {
        let (cache, clock) = cache(10);
        cache.set("k", 1, Duration::from_millis(10));
        clock.advance(Duration::from_millis(11));
        assert!(!cache.has("k"));
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_evicts_first_inserted() {
        let (cache, _) = cache(2);
        cache.set("a", 1, TTL);
        cache.set("b", 2, TTL);
        cache.set("c", 3, TTL);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn eviction_ignores_reads() {
        let (cache, _) = cache(2);
        cache.set("a", 1, TTL);
        cache.set("b", 2, TTL);
        // 读取不改变淘汰顺序
        assert_eq!(cache.get("a"), Some(1));
        cache.set("c", 3, TTL);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn overwrite_at_capacity_does_not_evict() {
        let (cache, _) = cache(2);
        cache.set("a", 1, TTL);
        cache.set("b", 2, TTL);
        cache.set("a", 10, TTL);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));

        // a 仍是最早插入的
        cache.set("c", 3, TTL);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn overwrite_refreshes_expiry() {
        let (cache, clock) = cache(4);
        cache.set("k", 1, Duration::from_millis(100));
        clock.advance(Duration::from_millis(90));
        cache.set("k", 2, Duration::from_millis(100));
        clock.advance(Duration::from_millis(90));
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn delete_is_noop_when_absent() {
        let (cache, _) = cache(4);
        cache.delete("missing");
        cache.set("k", 1, TTL);
        cache.delete("k");
        assert_eq!(cache.get("k"), None);

        // 删除后腾出的位置不会触发淘汰
        cache.set("x", 1, TTL);
        cache.set("y", 2, TTL);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn cleanup_removes_only_expired() {
        let (cache, clock) = cache(10);
        cache.set("short", 1, Duration::from_millis(100));
        cache.set("long", 2, Duration::from_secs(600));
        clock.advance(Duration::from_millis(500));

        assert_eq!(cache.cleanup(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long"), Some(2));
    }

    #[test]
    fn clear_empties_cache() {
        let (cache, _) = cache(10);
        cache.set("a", 1, TTL);
        cache.set_default("b", 2);
        cache.clear();
        assert!(cache.is_empty());
        cache.set("c", 3, TTL);
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let (cache, _) = cache(0);
        cache.set("a", 1, TTL);
        assert_eq!(cache.max_entries(), 1);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[tokio::test]
    async fn get_or_compute_memoizes_success() {
        let (cache, _) = cache(10);
        let mut calls = 0;

        let first = cache
            .get_or_compute("k", TTL, || {
                calls += 1;
                async { Ok::<_, String>(42) }
            })
            .await
            .unwrap();
        assert_eq!(first, Cached::miss(42));

        let second = cache
            .get_or_compute("k", TTL, || async { Err::<i32, _>("not called".to_string()) })
            .await
            .unwrap();
        assert_eq!(second, Cached::hit(42));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn get_or_compute_does_not_cache_errors() {
        let (cache, _) = cache(10);
        let err = cache
            .get_or_compute("k", TTL, || async { Err::<i32, _>("boom") })
            .await;
        assert_eq!(err, Err("boom"));
        assert!(!cache.has("k"));
    }
}
