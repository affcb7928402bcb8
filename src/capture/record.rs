//! 通知记录
//!
//! `RawEvent` 是宿主送进来的原始通知，`NotificationRecord` 是规范化后
//! 存入历史的不可变记录。

use serde::{Deserialize, Serialize};

/// 宿主送入的原始通知
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    /// 来源包名 / 应用 id
    pub app_id: String,
    /// 显示用应用名，空时回落到 `app_id`
    pub app_name: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    /// 发布时间（毫秒），缺省时用捕获时间
    pub posted_at_ms: Option<i64>,
    /// 来源分配的通知 id
    pub id: i64,
    /// 是否为移除事件
    pub removed: bool,
    /// 通知自带的大图标（编码后的图片字节）
    #[serde(skip)]
    pub large_icon: Option<Vec<u8>>,
}

impl RawEvent {
    pub fn new(app_id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            title: Some(title.into()),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn with_posted_at(mut self, ms: i64) -> Self {
        self.posted_at_ms = Some(ms);
        self
    }

    pub fn with_large_icon(mut self, bytes: Vec<u8>) -> Self {
        self.large_icon = Some(bytes);
        self
    }

    /// 标题和正文是否都为空白
    pub fn is_blank(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().map_or(true, |v| v.trim().is_empty());
        blank(&self.title) && blank(&self.text)
    }
}

/// 历史中的一条通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub sequence_id: i64,
    pub source_app_id: String,
    pub display_app_name: String,
    pub title: String,
    pub content: String,
    pub posted_at_ms: i64,
    /// `<sourceAppId>:<sequenceId>`
    pub unique_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_payload: Option<String>,
}

impl NotificationRecord {
    /// 从原始事件构建；标题和正文都为空时返回 `None`
    pub fn from_raw(raw: &RawEvent, now_ms: i64) -> Option<Self> {
        if raw.is_blank() {
            return None;
        }

        let display_app_name = raw
            .app_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&raw.app_id)
            .to_string();

        Some(Self {
            sequence_id: raw.id,
            source_app_id: raw.app_id.clone(),
            display_app_name,
            title: raw.title.as_deref().unwrap_or_default().trim().to_string(),
            content: raw.text.as_deref().unwrap_or_default().trim().to_string(),
            posted_at_ms: raw.posted_at_ms.unwrap_or(now_ms),
            unique_id: unique_id(&raw.app_id, raw.id),
            icon_checksum: None,
            icon_payload: None,
        })
    }

    /// 附带图标（只在构建阶段使用，入库后不再修改）
    pub fn with_icon(mut self, checksum: String, payload: String) -> Self {
        self.icon_checksum = Some(checksum);
        self.icon_payload = Some(payload);
        self
    }
}

pub fn unique_id(app_id: &str, id: i64) -> String {
    format!("{}:{}", app_id, id)
}
