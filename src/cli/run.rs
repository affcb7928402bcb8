//! Run 命令 - 常驻宿主
//!
//! 从 stdin 逐行读取 JSON 通知事件送入捕获流程，同时运行保活调度。
//! 以 `!` 开头的行是控制命令：`!clear`、`!status`、`!history`、`!stop`。
//! Ctrl-C 时取消所有运行中的任务并退出。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use base64::Engine;
use clap::Args;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::capture::format::short_description;
use crate::capture::RawEvent;
use crate::cli::host::{FixedClipboard, IconDir, SingleFileMedia, StderrNotifier, StdinListener};
use crate::forwarder::{Forwarder, HostServices};
use crate::host::ListenerControl;
use crate::keepalive::KEEPALIVE_INTERVAL;
use crate::settings::SettingsHandle;

/// Run 命令参数
#[derive(Args)]
pub struct RunArgs {
    /// Keep-alive interval in seconds
    #[arg(long, default_value_t = KEEPALIVE_INTERVAL.as_secs())]
    pub keepalive_secs: u64,

    /// Directory with `<app id>.png` app icons
    #[arg(long)]
    pub icon_dir: Option<PathBuf>,
}

/// stdin 中的一行事件
#[derive(Debug, Deserialize)]
struct EventLine {
    #[serde(flatten)]
    event: RawEvent,
    /// 通知自带图标（Base64）
    #[serde(default)]
    large_icon_base64: Option<String>,
}

impl EventLine {
    fn into_raw(self) -> RawEvent {
        let icon = self
            .large_icon_base64
            .and_then(|b| base64::engine::general_purpose::STANDARD.decode(b.trim()).ok());
        match icon {
            Some(bytes) => self.event.with_large_icon(bytes),
            None => self.event,
        }
    }
}

/// 处理 run 命令
pub async fn handle_run(settings: &SettingsHandle, args: RunArgs) -> Result<()> {
    let listener = StdinListener::new();
    let mut host = HostServices::new(
        Arc::new(StderrNotifier),
        Arc::new(FixedClipboard::empty()),
        Arc::new(SingleFileMedia::none()),
    )
    .with_listener_control(listener.clone());
    if let Some(dir) = &args.icon_dir {
        host = host.with_icons(Arc::new(IconDir::new(dir)));
    }

    let forwarder = Forwarder::start(settings.clone(), host)?;
    let keepalive = forwarder.spawn_keepalive(Duration::from_secs(args.keepalive_secs.max(1)));
    info!("Reading notification events from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_line(&forwarder, &listener, line.trim()) {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("stdin closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin");
                        listener.set_active(false);
                        forwarder.on_listener_stopped();
                        break;
                    }
                }
            }
        }
    }

    forwarder.drain().await;
    forwarder.shutdown();
    if let Some(handle) = keepalive {
        let _ = handle.await;
    }
    Ok(())
}

/// 返回 false 表示退出
fn handle_line(forwarder: &Forwarder, listener: &StdinListener, line: &str) -> bool {
    if line.is_empty() {
        return true;
    }

    if let Some(command) = line.strip_prefix('!') {
        match command.trim() {
            "clear" => forwarder.clear_history(),
            "status" => {
                let active = listener.is_listener_active().unwrap_or(false);
                println!("{}", forwarder.status_text(active));
            }
            "history" => {
                for record in forwarder.history_snapshot() {
                    println!("{}", short_description(&record));
                }
            }
            "stop" => return false,
            other => warn!(command = other, "Unknown command"),
        }
        return true;
    }

    match serde_json::from_str::<EventLine>(line) {
        Ok(event) => {
            forwarder.capture_event(event.into_raw());
        }
        Err(e) => warn!(error = %e, "Invalid event line"),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_line_with_icon() {
        let line = r#"{"app_id":"com.a","title":"T","id":1,"large_icon_base64":"AQID"}"#;
        let raw = serde_json::from_str::<EventLine>(line).unwrap().into_raw();
        assert_eq!(raw.app_id, "com.a");
        assert_eq!(raw.large_icon, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_event_line_bad_icon_is_ignored() {
        let line = r#"{"app_id":"com.a","text":"C","large_icon_base64":"%%%"}"#;
        let raw = serde_json::from_str::<EventLine>(line).unwrap().into_raw();
        assert!(raw.large_icon.is_none());
        assert_eq!(raw.text.as_deref(), Some("C"));
    }
}
