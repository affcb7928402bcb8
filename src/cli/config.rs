//! Config 命令 - 查看和修改配置文件

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::output::format_output;
use crate::settings::SettingsHandle;

/// Config 命令参数
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current settings
    Show {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Set server address (default port 19283 is appended when missing)
    SetServer { address: String },
    /// Set history limit (clamped to 1..=10000)
    SetLimit { limit: usize },
    /// Set any field by name
    Set { key: String, value: String },
}

/// 处理 config 命令
pub fn handle_config(settings: &SettingsHandle, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Show { json } => {
            let s = settings.snapshot();
            if json {
                println!("{}", format_output(&s, true));
            } else {
                if let Some(path) = settings.path() {
                    println!("Config file: {}", path.display());
                }
                println!("{}", format_output(&s, false));
                println!("Device name: {}", s.resolved_device_name());
            }
        }
        ConfigCommand::SetServer { address } => {
            let s = settings.save_server_address(&address)?;
            if s.has_server() {
                println!("✓ Server address set to {}", s.server_address);
            } else {
                println!("✓ Server address cleared");
            }
        }
        ConfigCommand::SetLimit { limit } => {
            let s = settings.save_notification_limit(limit)?;
            if s.notification_limit != limit {
                println!("⚠️  {} is out of range, clamped", limit);
            }
            println!("✓ Notification limit set to {}", s.notification_limit);
        }
        ConfigCommand::Set { key, value } => {
            settings.update(|s| s.set_field(&key, &value))?;
            println!("✓ {} updated", key);
        }
    }
    Ok(())
}
