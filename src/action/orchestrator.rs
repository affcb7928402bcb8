//! 按需任务编排
//!
//! 两种任务（发送剪贴板、发送最新图片）各自单飞：运行中再次请求会被直接拒绝。
//! 每次运行都有 30 秒总期限，超时、取消、panic 都会走同一个清理流程，
//! 常驻状态一定回到空闲，单飞标记一定被释放。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::action::beacon::{StatusBeacon, TaskState};
use crate::action::notice::{Notice, NoticeSender};
use crate::dispatch::{DispatchClient, Payload};
use crate::error::{ClipboardError, Permission, TaskError};
use crate::host::{ClipboardContent, ClipboardReader, ContentType, MediaIndex};
use crate::settings::SettingsHandle;

/// 单次运行的总期限
pub const TASK_DEADLINE: Duration = Duration::from_secs(30);
/// 剪贴板读取次数
pub const CLIPBOARD_READ_ATTEMPTS: u32 = 3;
/// 两次读取之间的间隔
pub const CLIPBOARD_RETRY_DELAY: Duration = Duration::from_millis(100);
/// 后台读取前等待界面切换完成
pub const BACKGROUND_SETTLE_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Clipboard,
    Image,
}

impl TaskKind {
    fn sending_state(self) -> TaskState {
        match self {
            TaskKind::Clipboard => TaskState::SendingClipboard,
            TaskKind::Image => TaskState::SendingImage,
        }
    }

    fn title(self) -> &'static str {
        match self {
            TaskKind::Clipboard => "Clipboard",
            TaskKind::Image => "Image",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Clipboard => write!(f, "clipboard"),
            TaskKind::Image => write!(f, "image"),
        }
    }
}

/// 一次运行的结果
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Sent,
    /// 剪贴板为空或没有图片
    Empty,
    Failed(TaskError),
}

/// 单飞标记的持有者，drop 时释放
struct FlightGuard {
    flag: Arc<AtomicBool>,
}

impl FlightGuard {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// 一次运行的清理：先复位状态，再释放单飞标记
struct RunGuard {
    kind: TaskKind,
    beacon: Option<Arc<StatusBeacon>>,
    _flight: FlightGuard,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Some(beacon) = &self.beacon {
            beacon.reset();
        }
        debug!(kind = %self.kind, "Task cleaned up");
    }
}

struct Inner {
    settings: SettingsHandle,
    dispatch: DispatchClient,
    beacon: Arc<StatusBeacon>,
    notices: NoticeSender,
    clipboard: Arc<dyn ClipboardReader>,
    media: Arc<dyn MediaIndex>,
    foreground: AtomicBool,
    clipboard_flight: Arc<AtomicBool>,
    image_flight: Arc<AtomicBool>,
    cancel: CancellationToken,
    deadline: Duration,
    runs: TaskTracker,
    runtime: Handle,
}

/// 按需任务编排器，clone 共享同一状态
#[derive(Clone)]
pub struct ActionOrchestrator {
    inner: Arc<Inner>,
}

impl ActionOrchestrator {
    pub fn new(
        settings: SettingsHandle,
        dispatch: DispatchClient,
        beacon: Arc<StatusBeacon>,
        notices: NoticeSender,
        clipboard: Arc<dyn ClipboardReader>,
        media: Arc<dyn MediaIndex>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                dispatch,
                beacon,
                notices,
                clipboard,
                media,
                foreground: AtomicBool::new(false),
                clipboard_flight: Arc::new(AtomicBool::new(false)),
                image_flight: Arc::new(AtomicBool::new(false)),
                cancel: CancellationToken::new(),
                deadline: TASK_DEADLINE,
                runs: TaskTracker::new(),
                runtime,
            }),
        }
    }

    /// 修改总期限（只能在共享之前调用）
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.deadline = deadline;
        } else {
            warn!("Orchestrator already shared, deadline unchanged");
        }
        self
    }

    pub fn request_clipboard_send(&self) -> Option<JoinHandle<TaskOutcome>> {
        self.request(TaskKind::Clipboard)
    }

    pub fn request_image_send(&self) -> Option<JoinHandle<TaskOutcome>> {
        self.request(TaskKind::Image)
    }

    /// 发起一次任务；同类任务正在运行时返回 `None` 并提示
    pub fn request(&self, kind: TaskKind) -> Option<JoinHandle<TaskOutcome>> {
        let flag = match kind {
            TaskKind::Clipboard => &self.inner.clipboard_flight,
            TaskKind::Image => &self.inner.image_flight,
        };
        let Some(flight) = FlightGuard::try_acquire(flag) else {
            info!(kind = %kind, "Task already running, request rejected");
            self.inner.notices.send(Notice::info("Task already running"));
            return None;
        };

        let this = self.clone();
        Some(
            self.inner
                .runs
                .spawn_on(async move { this.execute(kind, flight).await }, &self.inner.runtime),
        )
    }

    pub fn is_running(&self, kind: TaskKind) -> bool {
        match kind {
            TaskKind::Clipboard => self.inner.clipboard_flight.load(Ordering::Acquire),
            TaskKind::Image => self.inner.image_flight.load(Ordering::Acquire),
        }
    }

    pub fn status(&self) -> TaskState {
        self.inner.beacon.get()
    }

    pub fn on_app_foreground_changed(&self, foreground: bool) {
        debug!(foreground, "Foreground changed");
        self.inner.foreground.store(foreground, Ordering::SeqCst);
    }

    /// 宿主退出：取消所有运行中的任务并复位状态
    pub fn shutdown(&self) {
        info!("Shutting down orchestrator");
        self.inner.cancel.cancel();
        self.inner.beacon.reset();
    }

    /// 等待当前所有运行结束
    pub async fn wait_idle(&self) {
        self.inner.runs.close();
        self.inner.runs.wait().await;
        self.inner.runs.reopen();
    }

    async fn execute(self, kind: TaskKind, flight: FlightGuard) -> TaskOutcome {
        let persistent = self.inner.settings.snapshot().persistent_status_enabled;
        let _cleanup = RunGuard {
            kind,
            beacon: persistent.then(|| self.inner.beacon.clone()),
            _flight: flight,
        };
        if persistent {
            self.inner.beacon.set(kind.sending_state());
        }

        info!(kind = %kind, "Task started");
        let inner = self.inner.clone();
        let body = tokio::spawn(async move {
            match kind {
                TaskKind::Clipboard => inner.send_clipboard().await,
                TaskKind::Image => inner.send_latest_image().await,
            }
        });
        let abort = body.abort_handle();

        let result = tokio::select! {
            _ = self.inner.cancel.cancelled() => {
                abort.abort();
                Err(TaskError::Cancelled)
            }
            joined = tokio::time::timeout(self.inner.deadline, body) => match joined {
                Err(_) => {
                    abort.abort();
                    Err(TaskError::Timeout(self.inner.deadline))
                }
                Ok(Err(e)) => Err(TaskError::Unknown(format!("task aborted: {}", e))),
                Ok(Ok(result)) => result,
            },
        };

        self.report(kind, result)
    }

    fn report(&self, kind: TaskKind, result: Result<(), TaskError>) -> TaskOutcome {
        let notices = &self.inner.notices;
        match result {
            Ok(()) => {
                info!(kind = %kind, "Task finished");
                notices.send(Notice::success(match kind {
                    TaskKind::Clipboard => "Clipboard sent",
                    TaskKind::Image => "Image sent",
                }));
                TaskOutcome::Sent
            }
            Err(TaskError::ContentEmpty) => {
                info!(kind = %kind, "Nothing to send");
                notices.send(Notice::info(match kind {
                    TaskKind::Clipboard => "Clipboard is empty",
                    TaskKind::Image => "No images found",
                }));
                TaskOutcome::Empty
            }
            Err(TaskError::Cancelled) => {
                // 宿主正在退出，不再打扰用户
                info!(kind = %kind, "Task cancelled");
                TaskOutcome::Failed(TaskError::Cancelled)
            }
            Err(e) => {
                if matches!(e, TaskError::Unknown(_)) {
                    error!(kind = %kind, error = %e, "Task failed");
                } else {
                    warn!(kind = %kind, error = %e, "Task failed");
                }
                notices.send(Notice::from_task_error(kind.title(), &e));
                TaskOutcome::Failed(e)
            }
        }
    }
}

impl Inner {
    async fn send_clipboard(self: Arc<Self>) -> Result<(), TaskError> {
        let settings = self.settings.snapshot();
        if !settings.has_server() {
            return Err(TaskError::Configuration);
        }

        self.notices.send(Notice::info("Reading clipboard…"));
        let content = self.read_clipboard().await?;
        let payload = match content.content_type {
            _ if content.is_empty() => return Err(TaskError::ContentEmpty),
            ContentType::Text => Payload::ClipboardText(content.content),
            ContentType::Image => Payload::ClipboardImage(content.content),
            ContentType::Empty => return Err(TaskError::ContentEmpty),
        };

        self.notices.send(Notice::info("Sending…"));
        self.dispatch
            .send(&settings.server_address, &payload, &settings.resolved_device_name())
            .await?;
        Ok(())
    }

    /// 带重试的剪贴板读取，权限错误也在重试预算内
    async fn read_clipboard(&self) -> Result<ClipboardContent, TaskError> {
        let foreground = self.foreground.load(Ordering::SeqCst);
        if !foreground {
            tokio::time::sleep(BACKGROUND_SETTLE_DELAY).await;
        }

        let mut last_error = TaskError::Unknown("clipboard not read".to_string());
        for attempt in 1..=CLIPBOARD_READ_ATTEMPTS {
            let reader = self.clipboard.clone();
            let read = tokio::task::spawn_blocking(move || reader.read(foreground)).await;

            match read {
                Ok(Ok(content)) => return Ok(content),
                Ok(Err(e)) => {
                    debug!(attempt, error = %e, "Clipboard read failed");
                    last_error = match e.downcast_ref::<ClipboardError>() {
                        Some(ClipboardError::PermissionDenied) => {
                            TaskError::Permission(Permission::Clipboard)
                        }
                        _ => TaskError::Unknown(format!("clipboard read failed: {:#}", e)),
                    };
                }
                Err(e) => {
                    last_error = TaskError::Unknown(format!("clipboard reader panicked: {}", e));
                }
            }

            if attempt < CLIPBOARD_READ_ATTEMPTS {
                tokio::time::sleep(CLIPBOARD_RETRY_DELAY).await;
            }
        }
        Err(last_error)
    }

    async fn send_latest_image(self: Arc<Self>) -> Result<(), TaskError> {
        let settings = self.settings.snapshot();
        if !settings.has_server() {
            return Err(TaskError::Configuration);
        }
        if !self.media.has_media_permission() {
            return Err(TaskError::Permission(Permission::Media));
        }

        let media = self.media.clone();
        let image = tokio::task::spawn_blocking(move || media.latest_image())
            .await
            .map_err(|e| TaskError::Unknown(format!("media query panicked: {}", e)))?
            .map_err(|e| TaskError::Unknown(format!("media query failed: {:#}", e)))?;

        let Some(image) = image.filter(|i| !i.content.is_empty()) else {
            return Err(TaskError::ContentEmpty);
        };
        debug!(
            file_name = image.file_name.as_deref().unwrap_or("-"),
            mime_type = %image.mime_type,
            "Sending latest image"
        );

        self.notices.send(Notice::info("Sending…"));
        self.dispatch
            .send(
                &settings.server_address,
                &Payload::ImageRaw(image),
                &settings.resolved_device_name(),
            )
            .await?;
        Ok(())
    }
}
