use std::env;
use std::str::FromStr;
use std::time::Duration;

/// 限流参数：窗口内最多请求数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window_millis: u64,
}

impl RateLimitPolicy {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window_millis: u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_millis)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub api_rate_limit: RateLimitPolicy,
    pub auth_rate_limit: RateLimitPolicy,
    pub ai_rate_limit: RateLimitPolicy,
    pub cache_max_entries: usize,
    pub trip_plan_cache_ttl_secs: u64,
    pub route_cache_ttl_secs: u64,
    pub traffic_cache_ttl_secs: u64,
    pub cache_cleanup_interval_secs: u64,
    pub rate_limit_cleanup_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".into(),
            server_port: 3000,
            api_base_uri: "/api".into(),
            api_rate_limit: RateLimitPolicy::new(100, Duration::from_secs(15 * 60)),
            auth_rate_limit: RateLimitPolicy::new(10, Duration::from_secs(15 * 60)),
            ai_rate_limit: RateLimitPolicy::new(20, Duration::from_secs(60 * 60)),
            cache_max_entries: 100,
            trip_plan_cache_ttl_secs: 30 * 60,
            route_cache_ttl_secs: 15 * 60,
            traffic_cache_ttl_secs: 5 * 60,
            cache_cleanup_interval_secs: 10 * 60,
            rate_limit_cleanup_interval_secs: 5 * 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置，缺省项使用默认值
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let policy = |requests_key: &'static str, window_key: &'static str, default: RateLimitPolicy| {
            Ok::<_, ConfigError>(RateLimitPolicy::new(
                parse_or(&lookup, requests_key, default.max_requests)?,
                Duration::from_secs(parse_or(&lookup, window_key, default.window_millis / 1000)?),
            ))
        };

        Ok(Config {
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_or(&lookup, "SERVER_PORT", defaults.server_port)?,
            api_base_uri: lookup("API_BASE_URI").unwrap_or(defaults.api_base_uri),
            api_rate_limit: policy(
                "API_RATE_LIMIT_REQUESTS",
                "API_RATE_LIMIT_WINDOW",
                defaults.api_rate_limit,
            )?,
            auth_rate_limit: policy(
                "AUTH_RATE_LIMIT_REQUESTS",
                "AUTH_RATE_LIMIT_WINDOW",
                defaults.auth_rate_limit,
            )?,
            ai_rate_limit: policy(
                "AI_RATE_LIMIT_REQUESTS",
                "AI_RATE_LIMIT_WINDOW",
                defaults.ai_rate_limit,
            )?,
            cache_max_entries: parse_or(&lookup, "CACHE_MAX_ENTRIES", defaults.cache_max_entries)?,
            trip_plan_cache_ttl_secs: parse_or(
                &lookup,
                "TRIP_PLAN_CACHE_TTL",
                defaults.trip_plan_cache_ttl_secs,
            )?,
            route_cache_ttl_secs: parse_or(&lookup, "ROUTE_CACHE_TTL", defaults.route_cache_ttl_secs)?,
            traffic_cache_ttl_secs: parse_or(
                &lookup,
                "TRAFFIC_CACHE_TTL",
                defaults.traffic_cache_ttl_secs,
            )?,
            cache_cleanup_interval_secs: parse_or(
                &lookup,
                "CACHE_CLEANUP_INTERVAL",
                defaults.cache_cleanup_interval_secs,
            )?,
            rate_limit_cleanup_interval_secs: parse_or(
                &lookup,
                "RATE_LIMIT_CLEANUP_INTERVAL",
                defaults.rate_limit_cleanup_interval_secs,
            )?,
        })
    }

    pub fn trip_plan_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.trip_plan_cache_ttl_secs)
    }

    pub fn route_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.route_cache_ttl_secs)
    }

    pub fn traffic_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.traffic_cache_ttl_secs)
    }

    pub fn cache_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cache_cleanup_interval_secs.max(1))
    }

    pub fn rate_limit_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cleanup_interval_secs.max(1))
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        _ => Ok(default),
    }
}
