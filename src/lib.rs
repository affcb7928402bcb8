//! Notify Forwarders - 捕获系统通知并转发到远程 HTTP 服务
//!
//! 通知进入有界历史后异步转发；剪贴板和最新图片按需发送，
//! 每种任务单飞且有总期限。

pub mod action;
pub mod api;
pub mod capture;
pub mod cli;
pub mod clock;
pub mod dispatch;
pub mod error;
pub mod forwarder;
pub mod host;
pub mod icon;
pub mod keepalive;
pub mod settings;

pub use action::{ActionOrchestrator, Notice, NoticeAction, NoticeLevel, StatusBeacon, TaskKind, TaskOutcome, TaskState};
pub use api::{build_api_url, format_server_address, PayloadKind};
pub use capture::{CaptureListener, EventStore, NotificationRecord, RawEvent};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatch::{DispatchClient, Payload};
pub use error::{DispatchError, TaskError};
pub use forwarder::{Forwarder, HostServices};
pub use host::{ClipboardContent, ClipboardReader, ContentType, IconSource, ImageContent, ListenerControl, MediaIndex, UserNotifier};
pub use icon::{IconCache, IconCacheEntry};
pub use keepalive::KeepAliveScheduler;
pub use settings::{Settings, SettingsHandle};
