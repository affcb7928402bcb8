//! 错误类型

use std::time::Duration;

/// HTTP 发送失败原因
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("connection refused: {0}")]
    ConnectRefused(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("host could not be resolved: {0}")]
    HostUnresolvable(String),

    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no server address configured")]
    NotConfigured,

    #[error("unknown dispatch error: {0}")]
    Unknown(String),
}

impl DispatchError {
    /// 是否属于可忽略后重试的网络错误
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DispatchError::ConnectRefused(_)
                | DispatchError::Timeout(_)
                | DispatchError::HostUnresolvable(_)
                | DispatchError::Unknown(_)
        )
    }
}

/// 需要的系统权限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Clipboard,
    Media,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::Clipboard => write!(f, "clipboard"),
            Permission::Media => write!(f, "media"),
        }
    }
}

/// 按需任务的错误分类
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaskError {
    #[error("server address is not configured")]
    Configuration,

    #[error("{0} access denied")]
    Permission(Permission),

    #[error("network error: {0}")]
    Transient(DispatchError),

    #[error("server rejected the request: {0}")]
    Rejected(DispatchError),

    /// 剪贴板为空或找不到图片，不是真正的错误
    #[error("nothing to send")]
    ContentEmpty,

    #[error("task timed out after {0:?}")]
    Timeout(Duration),

    #[error("task cancelled")]
    Cancelled,

    #[error("{0}")]
    Unknown(String),
}

impl From<DispatchError> for TaskError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::NotConfigured => TaskError::Configuration,
            e if e.is_transient() => TaskError::Transient(e),
            e => TaskError::Rejected(e),
        }
    }
}

/// 剪贴板读取器可以返回的特定错误（通过 anyhow downcast 识别）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard access denied")]
    PermissionDenied,

    #[error("clipboard temporarily unavailable: {0}")]
    Unavailable(String),
}

/// 配置读写错误
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config directory not available")]
    NoConfigDir,

    #[error("unknown setting: {0}")]
    UnknownKey(String),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_classification() {
        assert!(DispatchError::Timeout(Duration::from_secs(5)).is_transient());
        assert!(DispatchError::ConnectRefused("x".into()).is_transient());
        assert!(!DispatchError::Status { status: 500, body: String::new() }.is_transient());
        assert!(!DispatchError::NotConfigured.is_transient());
    }

    #[test]
    fn test_task_error_from_dispatch_error() {
        assert_eq!(TaskError::from(DispatchError::NotConfigured), TaskError::Configuration);
        assert!(matches!(
            TaskError::from(DispatchError::HostUnresolvable("h".into())),
            TaskError::Transient(_)
        ));
        assert!(matches!(
            TaskError::from(DispatchError::Status { status: 404, body: "nope".into() }),
            TaskError::Rejected(_)
        ));
    }
}
