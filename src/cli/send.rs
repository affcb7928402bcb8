//! 一次性命令：版本检查、验证码、捕获、剪贴板、图片

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use crate::action::TaskOutcome;
use crate::api::SERVER_VERSION_REQUIRED;
use crate::capture::RawEvent;
use crate::cli::host::{FixedClipboard, IconDir, SingleFileMedia, StderrNotifier};
use crate::cli::output::format_record;
use crate::forwarder::{Forwarder, HostServices};
use crate::settings::SettingsHandle;

/// Capture 命令参数
#[derive(Args)]
pub struct CaptureArgs {
    /// Source app id (package name)
    #[arg(long)]
    pub app: String,

    /// Display name, defaults to the app id
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub content: Option<String>,

    /// Notification id from the source
    #[arg(long, default_value = "0")]
    pub id: i64,

    /// Notification's own icon (image file)
    #[arg(long)]
    pub icon: Option<PathBuf>,

    /// Directory with `<app id>.png` app icons
    #[arg(long)]
    pub icon_dir: Option<PathBuf>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

/// Clipboard 命令参数
#[derive(Args)]
pub struct ClipboardArgs {
    /// Text to send
    #[arg(long, conflicts_with = "image")]
    pub text: Option<String>,

    /// Image file to send
    #[arg(long)]
    pub image: Option<PathBuf>,
}

/// Image 命令参数
#[derive(Args)]
pub struct ImageArgs {
    /// Image file treated as the latest media item
    pub file: PathBuf,
}

fn start(settings: &SettingsHandle, host: HostServices) -> Result<Forwarder> {
    Ok(Forwarder::start(settings.clone(), host)?)
}

fn quiet_host() -> HostServices {
    HostServices::new(
        Arc::new(StderrNotifier),
        Arc::new(FixedClipboard::empty()),
        Arc::new(SingleFileMedia::none()),
    )
}

/// 处理 check 命令
pub async fn handle_check(settings: &SettingsHandle) -> Result<()> {
    let forwarder = start(settings, quiet_host())?;
    let version = forwarder.check_server_version().await?;
    if version == SERVER_VERSION_REQUIRED {
        println!("✓ Server version {} (compatible)", version);
    } else {
        println!(
            "⚠️  Server version {} does not match required {}",
            version, SERVER_VERSION_REQUIRED
        );
    }
    Ok(())
}

/// 处理 verify 命令
pub async fn handle_verify(settings: &SettingsHandle) -> Result<()> {
    let forwarder = start(settings, quiet_host())?;
    let code = forwarder.send_verification_code().await?;
    println!("Verification code sent: {}", code);
    Ok(())
}

/// 处理 capture 命令
pub async fn handle_capture(settings: &SettingsHandle, args: CaptureArgs) -> Result<()> {
    let mut host = quiet_host();
    if let Some(dir) = &args.icon_dir {
        host = host.with_icons(Arc::new(IconDir::new(dir)));
    }
    let forwarder = start(settings, host)?;

    let mut raw = RawEvent {
        app_id: args.app,
        app_name: args.name,
        title: args.title,
        text: args.content,
        id: args.id,
        ..Default::default()
    };
    if let Some(path) = &args.icon {
        raw = raw.with_large_icon(std::fs::read(path)?);
    }

    match forwarder.capture_event(raw) {
        Some(record) => println!("{}", format_record(&record, args.json)),
        None => println!("Notification dropped"),
    }
    forwarder.drain().await;
    Ok(())
}

/// 处理 clipboard 命令
pub async fn handle_clipboard(settings: &SettingsHandle, args: ClipboardArgs) -> Result<()> {
    let clipboard = match (&args.text, &args.image) {
        (Some(text), _) => FixedClipboard::text(text),
        (None, Some(path)) => FixedClipboard::image_file(path)?,
        (None, None) => FixedClipboard::empty(),
    };
    let host = HostServices::new(
        Arc::new(StderrNotifier),
        Arc::new(clipboard),
        Arc::new(SingleFileMedia::none()),
    );
    let forwarder = start(settings, host)?;
    // 命令行直接调用，视为前台
    forwarder.on_app_foreground_changed(true);
    finish(&forwarder, forwarder.request_clipboard_send()).await
}

/// 处理 image 命令
pub async fn handle_image(settings: &SettingsHandle, args: ImageArgs) -> Result<()> {
    let host = HostServices::new(
        Arc::new(StderrNotifier),
        Arc::new(FixedClipboard::empty()),
        Arc::new(SingleFileMedia::new(args.file)),
    );
    let forwarder = start(settings, host)?;
    finish(&forwarder, forwarder.request_image_send()).await
}

async fn finish(
    forwarder: &Forwarder,
    handle: Option<tokio::task::JoinHandle<TaskOutcome>>,
) -> Result<()> {
    let Some(handle) = handle else {
        anyhow::bail!("task already running");
    };
    let outcome = handle.await?;
    forwarder.drain().await;

    match outcome {
        TaskOutcome::Sent | TaskOutcome::Empty => Ok(()),
        TaskOutcome::Failed(e) => Err(e.into()),
    }
}
