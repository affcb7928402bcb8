//! 用户提示
//!
//! 所有提示都经过同一个 pump 任务按顺序交给 [`UserNotifier`]，
//! 保证 UI 侧只在一个上下文里被调用。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Permission, TaskError};
use crate::host::UserNotifier;

/// 错误提示自动消失时间
pub const ERROR_DISMISS_AFTER: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// 提示附带的跳转动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeAction {
    OpenSettings,
    GrantClipboardPermission,
    GrantMediaPermission,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
    /// 自动消失时间，`None` 表示由 UI 决定
    pub dismiss_after: Option<Duration>,
    pub action: Option<NoticeAction>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: String::new(),
            message: message.into(),
            dismiss_after: None,
            action: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            ..Self::info(message)
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
            dismiss_after: Some(ERROR_DISMISS_AFTER),
            action: None,
        }
    }

    pub fn with_action(mut self, action: NoticeAction) -> Self {
        self.action = Some(action);
        self
    }

    /// 任务错误对应的提示；`ContentEmpty` 不是错误，调用方自己处理
    pub fn from_task_error(title: &str, error: &TaskError) -> Self {
        match error {
            TaskError::Configuration => Notice::error(title, "Server address is not configured")
                .with_action(NoticeAction::OpenSettings),
            TaskError::Permission(Permission::Clipboard) => {
                Notice::error(title, "Clipboard access denied")
                    .with_action(NoticeAction::GrantClipboardPermission)
            }
            TaskError::Permission(Permission::Media) => {
                Notice::error(title, "Media access denied")
                    .with_action(NoticeAction::GrantMediaPermission)
            }
            TaskError::Timeout(_) => Notice::error(title, "Task timed out"),
            // 未知错误细节只进日志
            TaskError::Unknown(_) => Notice::error(title, "Something went wrong"),
            other => Notice::error(title, other.to_string()),
        }
    }
}

enum PumpMessage {
    Notice(Notice),
    Flush(oneshot::Sender<()>),
}

/// 提示发送端，clone 后在各组件间共享
#[derive(Clone)]
pub struct NoticeSender {
    tx: mpsc::UnboundedSender<PumpMessage>,
}

impl NoticeSender {
    pub fn send(&self, notice: Notice) {
        debug!(level = ?notice.level, message = %notice.message, "Queue notice");
        if self.tx.send(PumpMessage::Notice(notice)).is_err() {
            warn!("Notice pump stopped, dropping notice");
        }
    }

    /// 等待之前排队的提示全部送达
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(PumpMessage::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

/// 提示投递任务
pub struct NoticePump;

impl NoticePump {
    /// 启动投递任务；所有 sender 都释放后任务结束
    pub fn spawn(notifier: Arc<dyn UserNotifier>) -> (NoticeSender, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    PumpMessage::Notice(notice) => notifier.notify(notice),
                    PumpMessage::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("Notice pump finished");
        });
        (NoticeSender { tx }, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<Notice>>);

    impl UserNotifier for Collect {
        fn notify(&self, notice: Notice) {
            self.0.lock().unwrap().push(notice);
        }
    }

    #[tokio::test]
    async fn test_pump_delivers_in_order() {
        let sink = Arc::new(Collect::default());
        let (sender, handle) = NoticePump::spawn(sink.clone());

        sender.send(Notice::info("one"));
        sender.send(Notice::success("two"));
        sender.flush().await;

        let got: Vec<String> = sink.0.lock().unwrap().iter().map(|n| n.message.clone()).collect();
        assert_eq!(got, vec!["one", "two"]);

        drop(sender);
        handle.await.unwrap();
    }

    #[test]
    fn test_error_notice_defaults() {
        let n = Notice::error("Clipboard", "boom");
        assert_eq!(n.level, NoticeLevel::Error);
        assert_eq!(n.dismiss_after, Some(ERROR_DISMISS_AFTER));
        assert!(Notice::info("x").dismiss_after.is_none());
    }

    #[test]
    fn test_task_error_actions() {
        let n = Notice::from_task_error("Clipboard", &TaskError::Configuration);
        assert_eq!(n.action, Some(NoticeAction::OpenSettings));

        let n = Notice::from_task_error("Image", &TaskError::Permission(Permission::Media));
        assert_eq!(n.action, Some(NoticeAction::GrantMediaPermission));

        let n = Notice::from_task_error("Image", &TaskError::Unknown("secret detail".into()));
        assert!(!n.message.contains("secret"));
    }
}
