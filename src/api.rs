//! 远程 API 常量与地址处理
//!
//! 所有端点、超时和字段名集中在这里，`dispatch` 和 `settings` 共用。

use std::time::Duration;

/// 未指定端口时使用的默认端口
pub const DEFAULT_PORT: u16 = 19283;

pub const HTTP_PROTOCOL: &str = "http://";
pub const HTTPS_PROTOCOL: &str = "https://";

pub const ENDPOINT_NOTIFY: &str = "/api/notify";
pub const ENDPOINT_CLIPBOARD_TEXT: &str = "/api/notify/clipboard/text";
pub const ENDPOINT_CLIPBOARD_IMAGE: &str = "/api/notify/clipboard/image";
pub const ENDPOINT_IMAGE_RAW: &str = "/api/notify/image/raw";
pub const ENDPOINT_VERSION: &str = "/api/version";

/// 验证码通知使用的应用名
pub const APP_NAME: &str = "NotifyForwarders";

/// 客户端要求的服务端版本
pub const SERVER_VERSION_REQUIRED: &str = "1.0.0";

pub const CONTENT_TYPE_TEXT: &str = "text";
pub const CONTENT_TYPE_IMAGE: &str = "image";

/// 请求种类，决定端点、超时和请求体字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Notify,
    ClipboardText,
    ClipboardImage,
    ImageRaw,
    Version,
}

impl PayloadKind {
    pub fn endpoint(self) -> &'static str {
        match self {
            PayloadKind::Notify => ENDPOINT_NOTIFY,
            PayloadKind::ClipboardText => ENDPOINT_CLIPBOARD_TEXT,
            PayloadKind::ClipboardImage => ENDPOINT_CLIPBOARD_IMAGE,
            PayloadKind::ImageRaw => ENDPOINT_IMAGE_RAW,
            PayloadKind::Version => ENDPOINT_VERSION,
        }
    }

    /// 连接/读取超时（两者相同）
    pub fn timeout(self) -> Duration {
        match self {
            PayloadKind::Notify | PayloadKind::Version => Duration::from_secs(5),
            PayloadKind::ClipboardText | PayloadKind::ClipboardImage | PayloadKind::ImageRaw => {
                Duration::from_secs(10)
            }
        }
    }

    pub fn is_get(self) -> bool {
        matches!(self, PayloadKind::Version)
    }
}

/// 拼接完整 API URL，缺少协议时补 `http://`
///
/// ```
/// use notify_forwarders::api::build_api_url;
/// assert_eq!(
///     build_api_url("example.com:8080", "/api/notify"),
///     "http://example.com:8080/api/notify"
/// );
/// ```
pub fn build_api_url(server_address: &str, endpoint: &str) -> String {
    let address = server_address.trim();
    if address.starts_with(HTTP_PROTOCOL) || address.starts_with(HTTPS_PROTOCOL) {
        format!("{}{}", address, endpoint)
    } else {
        format!("{}{}{}", HTTP_PROTOCOL, address, endpoint)
    }
}

/// 规范化服务器地址：空白返回空串，没有端口时追加默认端口
pub fn format_server_address(address: &str) -> String {
    let address = address.trim();
    if address.is_empty() {
        return String::new();
    }

    if address.contains(':') {
        return address.to_string();
    }

    format!("{}:{}", address, DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_api_url_adds_scheme() {
        assert_eq!(
            build_api_url("example.com:8080", "/api/notify"),
            "http://example.com:8080/api/notify"
        );
    }

    #[test]
    fn test_build_api_url_keeps_https() {
        assert_eq!(
            build_api_url("https://example.com", "/api/version"),
            "https://example.com/api/version"
        );
        assert_eq!(
            build_api_url("http://10.0.0.5:19283", ENDPOINT_IMAGE_RAW),
            "http://10.0.0.5:19283/api/notify/image/raw"
        );
    }

    #[test]
    fn test_format_server_address() {
        assert_eq!(format_server_address("10.0.0.5"), "10.0.0.5:19283");
        assert_eq!(format_server_address("10.0.0.5:9000"), "10.0.0.5:9000");
        assert_eq!(format_server_address("  host.lan  "), "host.lan:19283");
        assert_eq!(format_server_address("   "), "");
        assert_eq!(format_server_address(""), "");
    }

    #[test]
    fn test_payload_kind_timeouts() {
        assert_eq!(PayloadKind::Notify.timeout(), Duration::from_secs(5));
        assert_eq!(PayloadKind::Version.timeout(), Duration::from_secs(5));
        assert_eq!(PayloadKind::ClipboardText.timeout(), Duration::from_secs(10));
        assert_eq!(PayloadKind::ClipboardImage.timeout(), Duration::from_secs(10));
        assert_eq!(PayloadKind::ImageRaw.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_payload_kind_endpoints() {
        assert_eq!(PayloadKind::Notify.endpoint(), "/api/notify");
        assert_eq!(PayloadKind::ClipboardText.endpoint(), "/api/notify/clipboard/text");
        assert_eq!(PayloadKind::ClipboardImage.endpoint(), "/api/notify/clipboard/image");
        assert!(PayloadKind::Version.is_get());
        assert!(!PayloadKind::ImageRaw.is_get());
    }
}
