//! 通知捕获
//!
//! - `record` - 原始事件与历史记录
//! - `store` - 有界历史
//! - `listener` - 捕获并异步转发
//! - `format` - 展示格式

pub mod format;
pub mod listener;
pub mod record;
pub mod store;

pub use listener::CaptureListener;
pub use record::{NotificationRecord, RawEvent};
pub use store::{EventStore, StoreEvent};
