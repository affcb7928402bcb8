//! 宿主协作者接口
//!
//! 核心不直接访问剪贴板、媒体库、图标或 UI，全部通过这些 trait 注入。
//! 所有实现都需要 `Send + Sync`，以 `Arc<dyn Trait>` 形式共享。

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::action::notice::Notice;

/// 剪贴板内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Image,
    Empty,
}

/// 剪贴板快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardContent {
    pub content_type: ContentType,
    /// Base64 编码的内容
    pub content: String,
    pub mime_type: Option<String>,
}

impl ClipboardContent {
    pub fn empty() -> Self {
        Self {
            content_type: ContentType::Empty,
            content: String::new(),
            mime_type: None,
        }
    }

    /// 文本内容（内部完成 UTF-8 → Base64）
    pub fn text(text: &str) -> Self {
        use base64::Engine;

        if text.trim().is_empty() {
            return Self::empty();
        }
        Self {
            content_type: ContentType::Text,
            content: base64::engine::general_purpose::STANDARD.encode(text.as_bytes()),
            mime_type: Some("text/plain".to_string()),
        }
    }

    /// 图片内容（原始字节 → Base64）
    pub fn image(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        use base64::Engine;

        if bytes.is_empty() {
            return Self::empty();
        }
        Self {
            content_type: ContentType::Image,
            content: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: Some(mime_type.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content_type == ContentType::Empty || self.content.is_empty()
    }
}

/// 媒体库中最新的图片
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageContent {
    /// Base64 编码的图片
    pub content: String,
    pub mime_type: String,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    /// 添加时间（Unix 秒）
    pub date_added: Option<i64>,
    /// 修改时间（Unix 秒）
    pub date_modified: Option<i64>,
}

/// 剪贴板读取器
pub trait ClipboardReader: Send + Sync {
    /// 读取一次剪贴板；`foreground` 表示应用当前是否在前台。
    ///
    /// 权限不足时返回包含 [`crate::error::ClipboardError::PermissionDenied`] 的错误。
    fn read(&self, foreground: bool) -> Result<ClipboardContent>;
}

/// 媒体库访问
pub trait MediaIndex: Send + Sync {
    fn has_media_permission(&self) -> bool;

    /// 最近添加的图片，没有图片时返回 `None`
    fn latest_image(&self) -> Result<Option<ImageContent>>;
}

/// 应用图标来源，返回编码后的图片字节（PNG/JPEG 等）
pub trait IconSource: Send + Sync {
    fn app_icon(&self, app_id: &str) -> Result<Vec<u8>>;
}

/// 面向用户的提示（toast / 错误通知）
pub trait UserNotifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// 通知监听器控制，供保活调度使用
pub trait ListenerControl: Send + Sync {
    fn is_listener_active(&self) -> Result<bool>;

    fn reregister_listener(&self) -> Result<()>;

    /// 确保捕获进程在运行（幂等）
    fn ensure_running(&self) -> Result<()>;
}

/// 没有图标来源时使用
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIcons;

impl IconSource for NoIcons {
    fn app_icon(&self, app_id: &str) -> Result<Vec<u8>> {
        Err(anyhow::anyhow!("no icon source for {}", app_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clipboard_text_is_base64() {
        let c = ClipboardContent::text("hello");
        assert_eq!(c.content_type, ContentType::Text);
        assert_eq!(c.content, "aGVsbG8=");
        assert_eq!(c.mime_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_blank_text_is_empty() {
        assert!(ClipboardContent::text("  \n").is_empty());
        assert!(ClipboardContent::image(&[], "image/png").is_empty());
    }

    #[test]
    fn test_no_icons_fails() {
        assert!(NoIcons.app_icon("com.example").is_err());
    }
}
