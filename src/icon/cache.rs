//! 图标缓存与推送限流
//!
//! 两张独立的表：
//! - 图标表：appId → 渲染结果，24 小时惰性过期
//! - 推送表：checksum → 上次推送时间，10 分钟内不重复推送
//!
//! 两张表都只做单 key 原子操作，不需要跨表事务。

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::icon::render::RenderedIcon;

/// 图标条目有效期
pub const ICON_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// 同一图标的最小推送间隔
pub const PUSH_WINDOW: Duration = Duration::from_secs(10 * 60);
/// 两次清理之间的最小间隔
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);

fn millis(d: Duration) -> i64 {
    d.as_millis() as i64
}

/// 缓存的图标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconCacheEntry {
    pub app_id: String,
    pub app_name: String,
    pub checksum: String,
    /// Base64 PNG
    pub payload: String,
    pub cached_at_ms: i64,
}

impl IconCacheEntry {
    fn is_expired(&self, now_ms: i64) -> bool {
        now_ms - self.cached_at_ms > millis(ICON_TTL)
    }
}

/// 图标缓存
pub struct IconCache {
    entries: DashMap<String, IconCacheEntry>,
    pushes: DashMap<String, i64>,
    clock: Arc<dyn Clock>,
    last_sweep_ms: AtomicI64,
}

impl IconCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            pushes: DashMap::new(),
            clock,
            last_sweep_ms: AtomicI64::new(0),
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// 取未过期的条目，没有则调用 `render` 生成
    ///
    /// 渲染失败不缓存任何东西，返回 `None`。
    pub fn get_or_build<F>(&self, app_id: &str, app_name: &str, render: F) -> Option<IconCacheEntry>
    where
        F: FnOnce() -> anyhow::Result<RenderedIcon>,
    {
        let now = self.clock.now_ms();

        // 先把引用释放掉再渲染，避免渲染期间持有分片锁
        let cached = self.entries.get(app_id).map(|e| e.clone());
        if let Some(entry) = cached {
            if !entry.is_expired(now) {
                return Some(entry);
            }
            debug!(app_id = %app_id, "Icon cache entry expired");
            self.entries
                .remove_if(app_id, |_, e| e.cached_at_ms == entry.cached_at_ms);
        }

        match render() {
            Ok(icon) => {
                let entry = IconCacheEntry {
                    app_id: app_id.to_string(),
                    app_name: app_name.to_string(),
                    checksum: icon.checksum,
                    payload: icon.payload,
                    cached_at_ms: now,
                };
                self.entries.insert(app_id.to_string(), entry.clone());
                debug!(app_id = %app_id, checksum = %entry.checksum, "Icon cached");
                Some(entry)
            }
            Err(e) => {
                debug!(app_id = %app_id, error = %e, "Icon render failed");
                None
            }
        }
    }

    /// 该校验值是否可以再次推送
    pub fn can_push(&self, checksum: &str) -> bool {
        let now = self.clock.now_ms();
        match self.pushes.get(checksum) {
            Some(last) => now - *last > millis(PUSH_WINDOW),
            None => true,
        }
    }

    /// 记录推送时间（发送前写入，失败不回滚）
    pub fn record_push(&self, checksum: &str) {
        self.pushes.insert(checksum.to_string(), self.clock.now_ms());
    }

    /// 距上次清理满 2 小时才真正清理，返回是否执行了清理
    pub fn sweep(&self, now_ms: i64) -> bool {
        let last = self.last_sweep_ms.load(Ordering::SeqCst);
        if now_ms - last < millis(SWEEP_INTERVAL) {
            return false;
        }
        // 并发调用只让一个执行
        if self
            .last_sweep_ms
            .compare_exchange(last, now_ms, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let icons_before = self.entries.len();
        let pushes_before = self.pushes.len();
        self.entries.retain(|_, e| !e.is_expired(now_ms));
        self.pushes
            .retain(|_, last| now_ms - *last <= millis(PUSH_WINDOW));

        let removed_icons = icons_before.saturating_sub(self.entries.len());
        let removed_pushes = pushes_before.saturating_sub(self.pushes.len());
        if removed_icons + removed_pushes > 0 {
            info!(removed_icons, removed_pushes, "Icon cache swept");
        }
        true
    }

    /// 按当前时间清理
    pub fn sweep_now(&self) -> bool {
        self.sweep(self.clock.now_ms())
    }

    /// 清空两张表
    pub fn clear_all(&self) {
        self.entries.clear();
        self.pushes.clear();
        debug!("Icon cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push_records(&self) -> usize {
        self.pushes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::AtomicUsize;

    const START: i64 = 1_700_000_000_000;

    fn setup() -> (Arc<ManualClock>, IconCache) {
        let clock = Arc::new(ManualClock::new(START));
        let cache = IconCache::new(clock.clone());
        (clock, cache)
    }

    fn icon(tag: &str) -> anyhow::Result<RenderedIcon> {
        Ok(RenderedIcon {
            checksum: format!("sum-{}", tag),
            payload: format!("payload-{}", tag),
        })
    }

    #[test]
    fn test_get_or_build_caches() {
        let (_clock, cache) = setup();
        let calls = AtomicUsize::new(0);
        let render = || {
            calls.fetch_add(1, Ordering::SeqCst);
            icon("a")
        };

        let first = cache.get_or_build("com.a", "A", render).unwrap();
        let second = cache.get_or_build("com.a", "A", || icon("b")).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.checksum, "sum-a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (clock, cache) = setup();
        cache.get_or_build("com.a", "A", || icon("v1")).unwrap();

        clock.advance(ICON_TTL - Duration::from_secs(1));
        assert_eq!(cache.get_or_build("com.a", "A", || icon("v2")).unwrap().checksum, "sum-v1");

        // 恰好 24 小时仍然有效
        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get_or_build("com.a", "A", || icon("v2")).unwrap().checksum, "sum-v1");

        clock.advance(Duration::from_millis(1));
        let rebuilt = cache.get_or_build("com.a", "A", || icon("v2")).unwrap();
        assert_eq!(rebuilt.checksum, "sum-v2");
        assert_eq!(rebuilt.cached_at_ms, START + millis(ICON_TTL) + 1);
    }

    #[test]
    fn test_render_failure_caches_nothing() {
        let (_clock, cache) = setup();
        assert!(cache
            .get_or_build("com.a", "A", || Err(anyhow::anyhow!("no icon")))
            .is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_push_window() {
        let (clock, cache) = setup();
        assert!(cache.can_push("abc"));
        cache.record_push("abc");
        assert!(!cache.can_push("abc"));
        assert!(cache.can_push("other"));

        clock.advance(PUSH_WINDOW - Duration::from_millis(1));
        assert!(!cache.can_push("abc"));
        // 恰好 10 分钟还不能推
        clock.advance(Duration::from_millis(1));
        assert!(!cache.can_push("abc"));
        clock.advance(Duration::from_millis(1));
        assert!(cache.can_push("abc"));
    }

    #[test]
    fn test_sweep_respects_interval() {
        let (clock, cache) = setup();
        cache.get_or_build("com.old", "Old", || icon("old")).unwrap();
        cache.record_push("sum-old");

        // 首次清理直接执行，但条目都还新
        assert!(cache.sweep(clock.now_ms()));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.push_records(), 1);

        clock.advance(ICON_TTL + Duration::from_millis(1));
        cache.get_or_build("com.new", "New", || icon("new")).unwrap();

        // 距上次清理不足 2 小时之前不会动
        assert!(!cache.sweep(START + millis(SWEEP_INTERVAL) - 1));

        assert!(cache.sweep_now());
        assert_eq!(cache.len(), 1);
        assert!(cache.get_or_build("com.new", "New", || icon("x")).is_some());
        assert_eq!(cache.push_records(), 0);

        assert!(!cache.sweep_now());
    }

    #[test]
    fn test_clear_all() {
        let (_clock, cache) = setup();
        cache.get_or_build("com.a", "A", || icon("a")).unwrap();
        cache.record_push("sum-a");
        cache.clear_all();
        assert!(cache.is_empty());
        assert!(cache.can_push("sum-a"));
    }
}
