use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::clock::duration_millis;

/// 缓存条目
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    pub stored_at: i64, // Unix 毫秒
    pub ttl: Duration,
    pub(crate) seq: u64, // 插入序号，用于按插入顺序淘汰
}

impl<V> CacheEntry<V> {
    pub fn new(data: V, stored_at: i64, ttl: Duration, seq: u64) -> Self {
        Self {
            data,
            stored_at,
            ttl,
            seq,
        }
    }

    /// `now - stored_at <= ttl` 时仍可读
    pub fn is_expired(&self, now: i64) -> bool {
        now.saturating_sub(self.stored_at) > duration_millis(self.ttl)
    }
}

/// 缓存命中统计
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// 带命中标记的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<V> {
    pub value: V,
    pub cached: bool,
}

impl<V> Cached<V> {
    pub fn hit(value: V) -> Self {
        Self {
            value,
            cached: true,
        }
    }

    pub fn miss(value: V) -> Self {
        Self {
            value,
            cached: false,
        }
    }
}

impl Cached<Value> {
    /// 在响应对象上附加 `cached` 字段；非对象结果包装在 `data` 下
    pub fn into_payload(self) -> Value {
        match self.value {
            Value::Object(mut map) => {
                map.insert("cached".to_string(), Value::Bool(self.cached));
                Value::Object(map)
            }
            other => serde_json::json!({ "data": other, "cached": self.cached }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_is_readable_up_to_ttl_inclusive() {
        let entry = CacheEntry::new(1, 1_000, Duration::from_millis(500), 0);
        assert!(!entry.is_expired(1_500));
        assert!(entry.is_expired(1_501));
    }

    #[test]
    fn payload_marks_cached_flag() {
        let hit = Cached::hit(json!({ "total_km": 12.5 })).into_payload();
        assert_eq!(hit, json!({ "total_km": 12.5, "cached": true }));

        let miss = Cached::miss(json!([1, 2])).into_payload();
        assert_eq!(miss, json!({ "data": [1, 2], "cached": false }));
    }

    #[test]
    fn hit_ratio_handles_empty_stats() {
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_ratio(), 0.75);
    }
}
