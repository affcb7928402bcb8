//! 测试用 HTTP 服务器和协作者

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify_forwarders::{
    ClipboardContent, ClipboardReader, ImageContent, MediaIndex, Notice, UserNotifier,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// 收到的一次请求
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: serde_json::Value,
}

#[derive(Clone)]
struct Behavior {
    status: u16,
    body: String,
    delay: Duration,
}

/// 最小 HTTP/1.1 服务器：每个连接处理一个请求
pub struct MockServer {
    pub addr: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
    behavior: Arc<Mutex<Behavior>>,
}

impl MockServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let behavior = Arc::new(Mutex::new(Behavior {
            status: 200,
            body: r#"{"version":"1.0.0"}"#.to_string(),
            delay: Duration::ZERO,
        }));

        let reqs = requests.clone();
        let beh = behavior.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let reqs = reqs.clone();
                let beh = beh.lock().unwrap().clone();
                tokio::spawn(async move {
                    let _ = serve(stream, reqs, beh).await;
                });
            }
        });

        Self {
            addr,
            requests,
            behavior,
        }
    }

    pub fn respond_with(&self, status: u16, body: &str) {
        let mut b = self.behavior.lock().unwrap();
        b.status = status;
        b.body = body.to_string();
    }

    /// 响应前等待，用于制造超时
    pub fn delay(&self, delay: Duration) {
        self.behavior.lock().unwrap().delay = delay;
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

async fn serve(
    mut stream: TcpStream,
    requests: Arc<Mutex<Vec<Recorded>>>,
    behavior: Behavior,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut first = head.lines().next().unwrap_or_default().split_whitespace();
    let method = first.next().unwrap_or_default().to_string();
    let path = first.next().unwrap_or_default().to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_bytes = &buf[header_end..(header_end + content_length).min(buf.len())];
    let body = serde_json::from_slice(body_bytes).unwrap_or(serde_json::Value::Null);
    requests.lock().unwrap().push(Recorded { method, path, body });

    if !behavior.delay.is_zero() {
        tokio::time::sleep(behavior.delay).await;
    }

    let response = format!(
        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        behavior.status,
        behavior.body.len(),
        behavior.body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// 收集所有提示
#[derive(Default)]
pub struct CollectNotices(pub Mutex<Vec<Notice>>);

impl UserNotifier for CollectNotices {
    fn notify(&self, notice: Notice) {
        self.0.lock().unwrap().push(notice);
    }
}

impl CollectNotices {
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|n| n.message.clone()).collect()
    }
}

pub struct TextClipboard(pub String);

impl ClipboardReader for TextClipboard {
    fn read(&self, _foreground: bool) -> anyhow::Result<ClipboardContent> {
        Ok(ClipboardContent::text(&self.0))
    }
}

pub struct OneImage(pub Option<ImageContent>);

impl MediaIndex for OneImage {
    fn has_media_permission(&self) -> bool {
        true
    }

    fn latest_image(&self) -> anyhow::Result<Option<ImageContent>> {
        Ok(self.0.clone())
    }
}

/// 一张纯色 PNG
pub fn png(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 120, 200, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}
