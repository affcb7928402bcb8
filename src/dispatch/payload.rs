//! 请求体定义
//!
//! 每种请求的字段集合固定，字段名与服务端约定一致（驼峰/小写混用是协议本身的样子）。

use serde::{Deserialize, Serialize};

use crate::api::{PayloadKind, CONTENT_TYPE_IMAGE, CONTENT_TYPE_TEXT};
use crate::capture::record::NotificationRecord;
use crate::host::ImageContent;

/// `/api/notify` 请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyBody {
    pub appname: String,
    pub title: String,
    pub description: String,
    pub devicename: String,
    #[serde(rename = "uniqueId", default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "iconMd5", default, skip_serializing_if = "Option::is_none")]
    pub icon_md5: Option<String>,
    #[serde(rename = "iconBase64", default, skip_serializing_if = "Option::is_none")]
    pub icon_base64: Option<String>,
}

/// 剪贴板文本/图片请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardBody {
    pub content: String,
    pub devicename: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

/// `/api/notify/image/raw` 请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRawBody {
    pub content: String,
    pub devicename: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(rename = "fileName", default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(rename = "filePath", default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(rename = "dateAdded", default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<i64>,
    #[serde(rename = "dateModified", default, skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<i64>,
}

/// 通知转发内容（不含设备名）
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyPayload {
    pub app_name: String,
    pub title: String,
    pub description: String,
    pub unique_id: Option<String>,
    pub id: Option<i64>,
    pub icon_md5: Option<String>,
    pub icon_base64: Option<String>,
}

impl NotifyPayload {
    /// 从历史记录构建，不带图标
    pub fn from_record(record: &NotificationRecord) -> Self {
        Self {
            app_name: record.display_app_name.clone(),
            title: record.title.clone(),
            description: record.content.clone(),
            unique_id: Some(record.unique_id.clone()),
            id: Some(record.sequence_id),
            icon_md5: None,
            icon_base64: None,
        }
    }
}

/// 一次发送的内容
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Notify(NotifyPayload),
    /// Base64 文本
    ClipboardText(String),
    /// Base64 图片
    ClipboardImage(String),
    ImageRaw(ImageContent),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Notify(_) => PayloadKind::Notify,
            Payload::ClipboardText(_) => PayloadKind::ClipboardText,
            Payload::ClipboardImage(_) => PayloadKind::ClipboardImage,
            Payload::ImageRaw(_) => PayloadKind::ImageRaw,
        }
    }

    /// 生成 JSON 请求体
    pub fn to_body(&self, device_name: &str) -> serde_json::Result<serde_json::Value> {
        let devicename = device_name.to_string();
        match self {
            Payload::Notify(p) => serde_json::to_value(NotifyBody {
                appname: p.app_name.clone(),
                title: p.title.clone(),
                description: p.description.clone(),
                devicename,
                unique_id: p.unique_id.clone(),
                id: p.id,
                icon_md5: p.icon_md5.clone(),
                // 没有校验值时不单独发送图标
                icon_base64: p.icon_md5.as_ref().and(p.icon_base64.clone()),
            }),
            Payload::ClipboardText(content) => serde_json::to_value(ClipboardBody {
                content: content.clone(),
                devicename,
                content_type: CONTENT_TYPE_TEXT.to_string(),
            }),
            Payload::ClipboardImage(content) => serde_json::to_value(ClipboardBody {
                content: content.clone(),
                devicename,
                content_type: CONTENT_TYPE_IMAGE.to_string(),
            }),
            Payload::ImageRaw(image) => serde_json::to_value(ImageRawBody {
                content: image.content.clone(),
                devicename,
                mime_type: image.mime_type.clone(),
                file_name: image.file_name.clone(),
                file_path: image.file_path.clone(),
                date_added: image.date_added,
                date_modified: image.date_modified,
            }),
        }
    }
}
