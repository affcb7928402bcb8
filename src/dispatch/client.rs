//! HTTP 发送客户端
//!
//! 不做重试，不碰任何缓存。每个请求按种类套用连接/读取超时，
//! 结果统一归类为 [`DispatchError`]。

use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::{build_api_url, PayloadKind, APP_NAME};
use crate::dispatch::payload::{NotifyPayload, Payload};
use crate::error::DispatchError;

/// 验证码通知的标题
pub const VERIFICATION_TITLE: &str = "Verification code";

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

/// 无状态的 HTTP 发送器，clone 共享同一个连接池
#[derive(Debug, Clone)]
pub struct DispatchClient {
    /// 5 秒连接超时（NOTIFY / VERSION）
    short: Client,
    /// 10 秒连接超时（剪贴板 / 图片）
    long: Client,
}

impl DispatchClient {
    pub fn new() -> Result<Self, DispatchError> {
        let build = |connect: Duration| {
            Client::builder()
                .connect_timeout(connect)
                .build()
                .map_err(|e| DispatchError::Unknown(format!("Failed to create HTTP client: {}", e)))
        };
        Ok(Self {
            short: build(PayloadKind::Notify.timeout())?,
            long: build(PayloadKind::ImageRaw.timeout())?,
        })
    }

    fn client_for(&self, kind: PayloadKind) -> &Client {
        if kind.timeout() > PayloadKind::Notify.timeout() {
            &self.long
        } else {
            &self.short
        }
    }

    /// 发送一次请求；HTTP 200 为成功，其它一律为错误
    pub async fn send(
        &self,
        server_address: &str,
        payload: &Payload,
        device_name: &str,
    ) -> Result<(), DispatchError> {
        if server_address.trim().is_empty() {
            return Err(DispatchError::NotConfigured);
        }

        let kind = payload.kind();
        let url = build_api_url(server_address, kind.endpoint());
        let body = payload
            .to_body(device_name)
            .map_err(|e| DispatchError::Unknown(format!("Failed to encode body: {}", e)))?;

        debug!(kind = ?kind, url = %url, "Dispatching payload");

        let response = self
            .client_for(kind)
            // 连接和读取各占一份超时
            .post(&url)
            .timeout(kind.timeout() * 2)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| classify(&e, kind))?;

        check_status(response).await?;
        debug!(kind = ?kind, "Payload delivered");
        Ok(())
    }

    /// 查询服务端版本（`GET /api/version`）
    pub async fn check_server_version(&self, server_address: &str) -> Result<String, DispatchError> {
        if server_address.trim().is_empty() {
            return Err(DispatchError::NotConfigured);
        }

        let kind = PayloadKind::Version;
        let url = build_api_url(server_address, kind.endpoint());
        let response = self
            .client_for(kind)
            .get(&url)
            .timeout(kind.timeout() * 2)
            .send()
            .await
            .map_err(|e| classify(&e, kind))?;

        let response = check_status(response).await?;
        let version: VersionResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::Unknown(format!("Failed to parse version: {}", e)))?;
        Ok(version.version)
    }

    /// 发送一条带六位随机验证码的通知，返回验证码
    pub async fn send_verification_code(
        &self,
        server_address: &str,
        device_name: &str,
    ) -> Result<String, DispatchError> {
        let code = generate_verification_code();
        let payload = Payload::Notify(NotifyPayload {
            app_name: APP_NAME.to_string(),
            title: VERIFICATION_TITLE.to_string(),
            description: format!("Verification code: {}", code),
            unique_id: None,
            id: None,
            icon_md5: None,
            icon_base64: None,
        });
        self.send(server_address, &payload, device_name).await?;
        Ok(code)
    }
}

/// 六位数字验证码
pub fn generate_verification_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    n.to_string()
}

/// 只接受 200，其它状态带上响应体返回
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DispatchError> {
    let status = response.status();
    if status == reqwest::StatusCode::OK {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), body = %body, "Server rejected request");
    Err(DispatchError::Status {
        status: status.as_u16(),
        body,
    })
}

/// 把 reqwest 错误归类
fn classify(error: &reqwest::Error, kind: PayloadKind) -> DispatchError {
    if error.is_timeout() {
        return DispatchError::Timeout(kind.timeout());
    }

    let chain = error_chain(error);
    if error.is_connect() {
        if looks_like_dns_failure(&chain) {
            return DispatchError::HostUnresolvable(chain);
        }
        return DispatchError::ConnectRefused(chain);
    }
    DispatchError::Unknown(chain)
}

/// 拼接整条错误链，hyper 把 DNS 失败藏在 source 里
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(e) = source {
        parts.push(e.to_string());
        source = e.source();
    }
    parts.join(": ")
}

fn looks_like_dns_failure(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["dns error", "failed to lookup address", "name or service not known", "no such host"]
        .iter()
        .any(|needle| lower.contains(needle))
}
