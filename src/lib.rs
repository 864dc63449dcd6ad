use std::sync::Arc;

use cache::{Limiters, ResponseCache, Sweeper};
use clock::SharedClock;
use config::Config;
use routes::traffic::TrafficEstimator;
use routes::trip::{TemplatePlanner, TripPlanner};

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod utils;

/// 进程级共享状态，启动时构建一次，通过 `Arc` 注入各处理函数
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub clock: SharedClock,
    pub cache: Arc<ResponseCache>,
    pub limiters: Limiters,
    pub planner: Arc<dyn TripPlanner>,
    pub traffic: Arc<TrafficEstimator>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, clock::system_clock())
    }

    pub fn with_clock(config: Config, clock: SharedClock) -> Self {
        let planner = Arc::new(TemplatePlanner::new(clock.clone()));
        Self::with_planner(config, clock, planner)
    }

    pub fn with_planner(config: Config, clock: SharedClock, planner: Arc<dyn TripPlanner>) -> Self {
        let cache = Arc::new(ResponseCache::new(
            "responses",
            config.cache_max_entries,
            config.route_cache_ttl(),
            clock.clone(),
        ));
        let limiters = Limiters::from_config(&config, &clock);

        Self {
            config,
            clock,
            cache,
            limiters,
            planner,
            traffic: Arc::new(TrafficEstimator::default()),
        }
    }

    /// 启动缓存与限流器的定期清扫
    pub fn start_sweepers(&self) -> Sweeper {
        let mut sweeper = Sweeper::new();
        sweeper.spawn(self.cache.clone(), self.config.cache_cleanup_interval());
        for limiter in self.limiters.all() {
            sweeper.spawn(limiter.clone(), self.config.rate_limit_cleanup_interval());
        }
        sweeper
    }

    /// 测试用：清空缓存与限流状态
    pub fn reset(&self) {
        self.cache.clear();
        self.limiters.clear();
    }
}
