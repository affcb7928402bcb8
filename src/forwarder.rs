//! 对外入口
//!
//! 宿主只和 [`Forwarder`] 打交道：送入通知、触发按需任务、读取历史和状态。
//! 所有服务在这里显式构造并注入，没有全局单例。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::action::{
    ActionOrchestrator, NoticePump, NoticeSender, StatusBeacon, TaskOutcome, TaskState, Transition,
};
use crate::capture::{CaptureListener, EventStore, NotificationRecord, RawEvent, StoreEvent};
use crate::clock::{Clock, SystemClock};
use crate::dispatch::DispatchClient;
use crate::error::DispatchError;
use crate::host::{ClipboardReader, IconSource, ListenerControl, MediaIndex, NoIcons, UserNotifier};
use crate::icon::IconCache;
use crate::keepalive::KeepAliveScheduler;
use crate::settings::SettingsHandle;

/// 宿主提供的协作者
#[derive(Clone)]
pub struct HostServices {
    pub notifier: Arc<dyn UserNotifier>,
    pub clipboard: Arc<dyn ClipboardReader>,
    pub media: Arc<dyn MediaIndex>,
    pub icons: Arc<dyn IconSource>,
    pub listener: Option<Arc<dyn ListenerControl>>,
}

impl HostServices {
    pub fn new(
        notifier: Arc<dyn UserNotifier>,
        clipboard: Arc<dyn ClipboardReader>,
        media: Arc<dyn MediaIndex>,
    ) -> Self {
        Self {
            notifier,
            clipboard,
            media,
            icons: Arc::new(NoIcons),
            listener: None,
        }
    }

    pub fn with_icons(mut self, icons: Arc<dyn IconSource>) -> Self {
        self.icons = icons;
        self
    }

    pub fn with_listener_control(mut self, control: Arc<dyn ListenerControl>) -> Self {
        self.listener = Some(control);
        self
    }
}

pub struct Forwarder {
    settings: SettingsHandle,
    store: Arc<EventStore>,
    icons: Arc<IconCache>,
    dispatch: DispatchClient,
    beacon: Arc<StatusBeacon>,
    notices: NoticeSender,
    capture: CaptureListener,
    orchestrator: ActionOrchestrator,
    listener_control: Option<Arc<dyn ListenerControl>>,
    cancel: CancellationToken,
    pump: JoinHandle<()>,
    runtime: Handle,
}

impl Forwarder {
    /// 构造并启动（必须在 tokio 运行时内调用）
    pub fn start(settings: SettingsHandle, host: HostServices) -> Result<Self, DispatchError> {
        Self::start_with_clock(settings, host, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        settings: SettingsHandle,
        host: HostServices,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, DispatchError> {
        let snapshot = settings.snapshot();
        let dispatch = DispatchClient::new()?;
        let store = Arc::new(EventStore::new(snapshot.notification_limit));
        // 每次启动都是空缓存
        let icons = Arc::new(IconCache::new(clock));
        let beacon = Arc::new(StatusBeacon::new());
        let (notices, pump) = NoticePump::spawn(host.notifier.clone());
        // 宿主回调线程不在运行时内，后台任务统一投递到这里
        let runtime = Handle::current();

        let mut capture = CaptureListener::new(
            store.clone(),
            icons.clone(),
            dispatch.clone(),
            settings.clone(),
            host.icons.clone(),
            notices.clone(),
            runtime.clone(),
        );
        if let Some(control) = &host.listener {
            capture = capture.with_listener_control(control.clone());
        }

        let orchestrator = ActionOrchestrator::new(
            settings.clone(),
            dispatch.clone(),
            beacon.clone(),
            notices.clone(),
            host.clipboard.clone(),
            host.media.clone(),
            runtime.clone(),
        );

        info!(
            server = %snapshot.server_address,
            limit = snapshot.notification_limit,
            "Forwarder started"
        );

        Ok(Self {
            settings,
            store,
            icons,
            dispatch,
            beacon,
            notices,
            capture,
            orchestrator,
            listener_control: host.listener,
            cancel: CancellationToken::new(),
            pump,
            runtime,
        })
    }

    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    pub fn notices(&self) -> &NoticeSender {
        &self.notices
    }

    pub fn icon_cache(&self) -> &IconCache {
        &self.icons
    }

    pub fn capture_event(&self, raw: RawEvent) -> Option<NotificationRecord> {
        self.capture.on_event(raw)
    }

    /// 系统拆除了监听器
    pub fn on_listener_stopped(&self) {
        self.capture.on_stop();
    }

    /// 清空历史和图标缓存
    pub fn clear_history(&self) {
        self.store.clear();
        self.icons.clear_all();
        info!("History cleared");
    }

    pub fn history_snapshot(&self) -> Vec<NotificationRecord> {
        self.store.snapshot()
    }

    pub fn subscribe_history(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    pub fn request_clipboard_send(&self) -> Option<JoinHandle<TaskOutcome>> {
        self.orchestrator.request_clipboard_send()
    }

    pub fn request_image_send(&self) -> Option<JoinHandle<TaskOutcome>> {
        self.orchestrator.request_image_send()
    }

    pub fn status(&self) -> TaskState {
        self.beacon.get()
    }

    pub fn status_text(&self, listener_active: bool) -> String {
        self.beacon.status_text(&self.settings.snapshot(), listener_active)
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<Transition> {
        self.beacon.subscribe()
    }

    pub fn on_app_foreground_changed(&self, foreground: bool) {
        self.orchestrator.on_app_foreground_changed(foreground);
    }

    /// 启动保活调度；没有监听器控制时返回 `None`
    pub fn spawn_keepalive(&self, interval: Duration) -> Option<JoinHandle<()>> {
        let control = self.listener_control.clone()?;
        let _runtime = self.runtime.enter();
        Some(
            KeepAliveScheduler::new(control)
                .with_interval(interval)
                .spawn(self.cancel.child_token()),
        )
    }

    pub async fn check_server_version(&self) -> Result<String, DispatchError> {
        self.dispatch
            .check_server_version(&self.settings.snapshot().server_address)
            .await
    }

    /// 发送验证码通知，返回验证码
    pub async fn send_verification_code(&self) -> Result<String, DispatchError> {
        let settings = self.settings.snapshot();
        self.dispatch
            .send_verification_code(&settings.server_address, &settings.resolved_device_name())
            .await
    }

    /// 等待转发、按需任务和提示全部处理完
    pub async fn drain(&self) {
        self.capture.wait_forwards().await;
        self.orchestrator.wait_idle().await;
        self.notices.flush().await;
    }

    /// 宿主退出
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.orchestrator.shutdown();
        info!("Forwarder shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Forwarder {
    fn drop(&mut self) {
        self.cancel.cancel();
        // 其它 sender 可能还在后台任务里，直接结束投递任务
        self.pump.abort();
    }
}
