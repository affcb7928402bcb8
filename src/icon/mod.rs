//! 应用图标：渲染、缓存、推送限流

pub mod cache;
pub mod render;

pub use cache::{IconCache, IconCacheEntry, ICON_TTL, PUSH_WINDOW, SWEEP_INTERVAL};
pub use render::{md5_hex, render_icon, render_notification_icon, RenderedIcon, MAX_ICON_SIZE};
