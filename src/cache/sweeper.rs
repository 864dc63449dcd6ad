use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cache::{RateLimiter, TtlCache};

/// 可被定期清扫过期数据的容器
pub trait Sweep: Send + Sync + 'static {
    fn label(&self) -> &str;

    /// 清扫一次，返回清除的条目数
    fn sweep(&self) -> usize;
}

impl<V: Clone + Send + 'static> Sweep for TtlCache<V> {
    fn label(&self) -> &str {
        self.name()
    }

    fn sweep(&self) -> usize {
        self.cleanup()
    }
}

impl Sweep for RateLimiter {
    fn label(&self) -> &str {
        self.name()
    }

    fn sweep(&self) -> usize {
        self.cleanup()
    }
}

/// 后台清扫任务组
///
/// 每个目标一个定时任务，首个 tick 跳过。`shutdown` 或 drop 时取消全部任务。
pub struct Sweeper {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Sweeper {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    pub fn spawn(&mut self, target: Arc<dyn Sweep>, every: Duration) {
        let token = self.token.child_token();
        let every = every.max(Duration::from_millis(1));

        tracing::info!(container = target.label(), every_secs = every.as_secs(), "starting sweeper");

        self.handles.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await; // 第一次 tick 立即完成，跳过

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let purged = target.sweep();
                        if purged > 0 {
                            tracing::debug!(container = target.label(), purged, "swept expired entries");
                        }
                    }
                }
            }

            tracing::debug!(container = target.label(), "sweeper stopped");
        }));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// 取消所有任务并等待其退出
    pub async fn shutdown(mut self) {
        self.token.cancel();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                tracing::error!("sweeper task failed: {}", e);
            }
        }
    }
}

impl Default for Sweeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::RateLimitPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        sweeps: AtomicUsize,
    }

    impl Sweep for Counting {
        fn label(&self) -> &str {
            "counting"
        }

        fn sweep(&self) -> usize {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sweeps_on_interval_until_shutdown() {
        let target = Arc::new(Counting {
            sweeps: AtomicUsize::new(0),
        });
        let mut sweeper = Sweeper::new();
        sweeper.spawn(target.clone(), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(target.sweeps.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(140)).await;
        assert_eq!(target.sweeps.load(Ordering::SeqCst), 2);

        sweeper.shutdown().await;
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(target.sweeps.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeps_real_containers() {
        let clock = ManualClock::new(0);
        let cache = Arc::new(TtlCache::<u32>::new(
            "responses",
            8,
            Duration::from_millis(10),
            clock.shared(),
        ));
        let limiter = Arc::new(RateLimiter::new(
            "api",
            RateLimitPolicy::new(5, Duration::from_millis(10)),
            clock.shared(),
        ));
        cache.set_default("k", 1);
        limiter.is_allowed("client");
        clock.advance(Duration::from_millis(50));

        let mut sweeper = Sweeper::new();
        sweeper.spawn(cache.clone(), Duration::from_secs(1));
        sweeper.spawn(limiter.clone(), Duration::from_secs(1));
        assert_eq!(sweeper.len(), 2);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(cache.is_empty());
        assert!(limiter.is_empty());

        sweeper.shutdown().await;
    }
}
