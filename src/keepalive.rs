//! 监听器保活
//!
//! 每 15 分钟探测一次监听器；不活跃时重新注册（无论成败）并确保捕获进程在运行。
//! 监听器健康时除了探测之外什么都不做。

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::host::ListenerControl;

/// 默认保活周期
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// 单次检查的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveReport {
    pub listener_active: bool,
    pub reregistered: bool,
}

pub struct KeepAliveScheduler {
    control: Arc<dyn ListenerControl>,
    interval: Duration,
}

impl KeepAliveScheduler {
    pub fn new(control: Arc<dyn ListenerControl>) -> Self {
        Self {
            control,
            interval: KEEPALIVE_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// 执行一次检查，任何失败都只记日志
    pub fn run_once(&self) -> KeepAliveReport {
        let listener_active = match self.control.is_listener_active() {
            Ok(active) => active,
            Err(e) => {
                warn!(error = %e, "Listener probe failed, assuming inactive");
                false
            }
        };

        let mut reregistered = false;
        if !listener_active {
            info!("Listener inactive, re-registering");
            match self.control.reregister_listener() {
                Ok(()) => reregistered = true,
                Err(e) => warn!(error = %e, "Failed to re-register listener"),
            }
            if let Err(e) = self.control.ensure_running() {
                warn!(error = %e, "Failed to ensure capture is running");
            }
        }

        debug!(listener_active, reregistered, "Keep-alive check done");
        KeepAliveReport {
            listener_active,
            reregistered,
        }
    }

    /// 周期运行直到取消；首个 tick 跳过，启动时不立即检查
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.run_once();
                    }
                }
            }
            debug!("Keep-alive scheduler stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeControl {
        active: AtomicBool,
        probes: AtomicUsize,
        reregisters: AtomicUsize,
        ensures: AtomicUsize,
    }

    impl ListenerControl for FakeControl {
        fn is_listener_active(&self) -> anyhow::Result<bool> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            Ok(self.active.load(Ordering::SeqCst))
        }

        fn reregister_listener(&self) -> anyhow::Result<()> {
            self.reregisters.fetch_add(1, Ordering::SeqCst);
            self.active.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn ensure_running(&self) -> anyhow::Result<()> {
            self.ensures.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_healthy_listener_only_probes() {
        let control = Arc::new(FakeControl::default());
        control.active.store(true, Ordering::SeqCst);
        let report = KeepAliveScheduler::new(control.clone()).run_once();

        assert!(report.listener_active);
        assert!(!report.reregistered);
        assert_eq!(control.reregisters.load(Ordering::SeqCst), 0);
        assert_eq!(control.ensures.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_inactive_listener_is_reregistered() {
        let control = Arc::new(FakeControl::default());
        let report = KeepAliveScheduler::new(control.clone()).run_once();
        assert!(report.reregistered);
        assert_eq!(control.reregisters.load(Ordering::SeqCst), 1);
        assert_eq!(control.ensures.load(Ordering::SeqCst), 1);
    }

    struct BrokenControl(AtomicUsize);

    impl ListenerControl for BrokenControl {
        fn is_listener_active(&self) -> anyhow::Result<bool> {
            anyhow::bail!("probe unavailable")
        }

        fn reregister_listener(&self) -> anyhow::Result<()> {
            anyhow::bail!("not allowed")
        }

        fn ensure_running(&self) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_failures_are_swallowed() {
        let control = Arc::new(BrokenControl(AtomicUsize::new(0)));
        let report = KeepAliveScheduler::new(control.clone()).run_once();
        assert!(!report.listener_active);
        assert!(!report.reregistered);
        assert_eq!(control.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_every_interval_until_cancelled() {
        let control = Arc::new(FakeControl::default());
        let cancel = CancellationToken::new();
        let handle = KeepAliveScheduler::new(control.clone()).spawn(cancel.clone());

        // 启动时不检查
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(control.probes.load(Ordering::SeqCst), 0);

        tokio::time::sleep(KEEPALIVE_INTERVAL).await;
        assert_eq!(control.probes.load(Ordering::SeqCst), 1);

        tokio::time::sleep(KEEPALIVE_INTERVAL).await;
        assert_eq!(control.probes.load(Ordering::SeqCst), 2);
        // 第一次已重新注册，之后只探测
        assert_eq!(control.reregisters.load(Ordering::SeqCst), 1);

        cancel.cancel();
        handle.await.unwrap();
    }
}
