//! 通知捕获
//!
//! 宿主每收到一条系统通知就调用 [`CaptureListener::on_event`]。
//! 记录同步写入历史，转发在独立任务里进行，任何错误都不会回到宿主回调。

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::action::notice::{Notice, NoticeSender};
use crate::capture::record::{NotificationRecord, RawEvent};
use crate::capture::store::EventStore;
use crate::dispatch::{DispatchClient, NotifyPayload, Payload};
use crate::host::{IconSource, ListenerControl};
use crate::icon::{render_icon, render_notification_icon, IconCache};
use crate::settings::{Settings, SettingsHandle};

/// 通知捕获与转发
#[derive(Clone)]
pub struct CaptureListener {
    store: Arc<EventStore>,
    icons: Arc<IconCache>,
    dispatch: DispatchClient,
    settings: SettingsHandle,
    icon_source: Arc<dyn IconSource>,
    notices: NoticeSender,
    control: Option<Arc<dyn ListenerControl>>,
    forwards: TaskTracker,
    runtime: Handle,
}

impl CaptureListener {
    pub fn new(
        store: Arc<EventStore>,
        icons: Arc<IconCache>,
        dispatch: DispatchClient,
        settings: SettingsHandle,
        icon_source: Arc<dyn IconSource>,
        notices: NoticeSender,
        runtime: Handle,
    ) -> Self {
        Self {
            store,
            icons,
            dispatch,
            settings,
            icon_source,
            notices,
            control: None,
            forwards: TaskTracker::new(),
            runtime,
        }
    }

    /// 监听器被系统拆除时用来请求重启
    pub fn with_listener_control(mut self, control: Arc<dyn ListenerControl>) -> Self {
        self.control = Some(control);
        self
    }

    /// 处理一条系统通知
    ///
    /// 返回写入历史的记录；被丢弃的事件返回 `None`。可以在任意线程调用，
    /// 转发任务投递到构造时给定的运行时。
    pub fn on_event(&self, raw: RawEvent) -> Option<NotificationRecord> {
        let settings = self.settings.snapshot();
        if !settings.receive_enabled {
            debug!(app_id = %raw.app_id, "Receiving disabled, dropping event");
            return None;
        }
        if raw.removed {
            debug!(app_id = %raw.app_id, id = raw.id, "Notification removed, ignoring");
            return None;
        }

        let Some(mut record) = NotificationRecord::from_raw(&raw, self.icons.now_ms()) else {
            debug!(app_id = %raw.app_id, "Empty notification dropped");
            return None;
        };

        if settings.should_process_icons() {
            if let Some((checksum, payload)) = self.resolve_icon(&raw, &record, &settings) {
                record = record.with_icon(checksum, payload);
            }
        }

        self.store.set_capacity(settings.notification_limit);
        self.store.insert(record.clone());
        info!(unique_id = %record.unique_id, app = %record.display_app_name, "Notification captured");

        self.forward(record.clone(), &settings);
        Some(record)
    }

    /// 监听器被拆除，请求宿主重新注册
    pub fn on_stop(&self) {
        warn!("Notification listener stopped, requesting restart");
        if let Some(control) = &self.control {
            if let Err(e) = control.reregister_listener() {
                warn!(error = %e, "Failed to request listener restart");
            }
        }
    }

    /// 等待所有已发起的转发结束
    pub async fn wait_forwards(&self) {
        self.forwards.close();
        self.forwards.wait().await;
        self.forwards.reopen();
    }

    /// 通知自带图标优先，否则走应用图标缓存
    fn resolve_icon(
        &self,
        raw: &RawEvent,
        record: &NotificationRecord,
        settings: &Settings,
    ) -> Option<(String, String)> {
        let radius = settings.icon_corner_radius;

        if let Some(bytes) = raw.large_icon.as_deref().filter(|b| !b.is_empty()) {
            match render_notification_icon(bytes, radius) {
                Ok(icon) => return Some((icon.checksum, icon.payload)),
                Err(e) => debug!(app_id = %raw.app_id, error = %e, "Large icon unusable"),
            }
        }

        let entry = self
            .icons
            .get_or_build(&record.source_app_id, &record.display_app_name, || {
                render_icon(&self.icon_source.app_icon(&record.source_app_id)?, radius)
            });
        self.icons.sweep_now();
        entry.map(|e| (e.checksum, e.payload))
    }

    /// 异步转发，失败只记录日志和提示
    fn forward(&self, record: NotificationRecord, settings: &Settings) {
        if !settings.forward_enabled {
            debug!(unique_id = %record.unique_id, "Forwarding disabled");
            return;
        }
        if !settings.has_server() {
            debug!(unique_id = %record.unique_id, "No server configured, not forwarding");
            return;
        }

        let mut payload = NotifyPayload::from_record(&record);
        if settings.icon_forward_enabled {
            if let Some(checksum) = &record.icon_checksum {
                payload.icon_md5 = Some(checksum.clone());
                if self.icons.can_push(checksum) {
                    // 发送前标记，失败不回滚
                    self.icons.record_push(checksum);
                    payload.icon_base64 = record.icon_payload.clone();
                }
            }
        }

        let dispatch = self.dispatch.clone();
        let notices = self.notices.clone();
        let server = settings.server_address.clone();
        let device = settings.resolved_device_name();
        let unique_id = record.unique_id;

        let task = async move {
            match dispatch.send(&server, &Payload::Notify(payload), &device).await {
                Ok(()) => debug!(unique_id = %unique_id, "Notification forwarded"),
                Err(e) => {
                    warn!(unique_id = %unique_id, error = %e, "Failed to forward notification");
                    notices.send(Notice::error("Forward failed", e.to_string()));
                }
            }
        };
        self.forwards.spawn_on(task, &self.runtime);
    }
}
