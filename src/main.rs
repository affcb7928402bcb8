//! Notify Forwarders CLI
//!
//! 把通知、剪贴板和图片转发到配置的服务器

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use notify_forwarders::cli::{
    handle_capture, handle_check, handle_clipboard, handle_config, handle_image, handle_run,
    handle_verify, CaptureArgs, ClipboardArgs, ConfigArgs, ImageArgs, RunArgs,
};
use notify_forwarders::SettingsHandle;

#[derive(Parser)]
#[command(name = "nfw")]
#[command(about = "Notify Forwarders - 转发通知、剪贴板和图片到远程服务器")]
#[command(version)]
struct Cli {
    /// Settings file (default: ~/.config/notify-forwarders/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 查看或修改配置
    Config(ConfigArgs),
    /// 检查服务器版本
    Check,
    /// 发送验证码通知
    Verify,
    /// 捕获一条通知并转发
    Capture(CaptureArgs),
    /// 发送剪贴板内容
    Clipboard(ClipboardArgs),
    /// 发送图片
    Image(ImageArgs),
    /// 常驻运行，从 stdin 读取通知事件
    Run(RunArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("notify_forwarders=info,nfw=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => SettingsHandle::open(path)?,
        None => SettingsHandle::open_default()?,
    };

    match cli.command {
        Commands::Config(args) => handle_config(&settings, args)?,
        Commands::Check => handle_check(&settings).await?,
        Commands::Verify => handle_verify(&settings).await?,
        Commands::Capture(args) => handle_capture(&settings, args).await?,
        Commands::Clipboard(args) => handle_clipboard(&settings, args).await?,
        Commands::Image(args) => handle_image(&settings, args).await?,
        Commands::Run(args) => handle_run(&settings, args).await?,
    }

    Ok(())
}
