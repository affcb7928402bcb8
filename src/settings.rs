//! 用户配置 - `~/.config/notify-forwarders/settings.json`
//!
//! 读取时缺失字段回落到默认值，写入时先写临时文件再原子替换，
//! 并持有文件锁避免 CLI 和常驻进程同时写入。

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::api::format_server_address;
use crate::error::SettingsError;

pub const MIN_NOTIFICATION_LIMIT: usize = 1;
pub const DEFAULT_NOTIFICATION_LIMIT: usize = 200;
pub const MAX_NOTIFICATION_LIMIT: usize = 10_000;

pub const DEFAULT_ICON_CORNER_RADIUS: u8 = 20;
pub const MAX_ICON_CORNER_RADIUS: u8 = 50;

/// 持久化的用户配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 服务器地址（已规范化，含端口）
    pub server_address: String,
    /// 历史记录上限
    pub notification_limit: usize,
    /// 是否接收系统通知
    pub receive_enabled: bool,
    /// 是否转发到服务器
    pub forward_enabled: bool,
    /// 是否随通知转发图标
    pub icon_forward_enabled: bool,
    /// 历史列表是否显示图标
    pub list_icon_enabled: bool,
    /// 是否显示常驻状态通知
    pub persistent_status_enabled: bool,
    /// 图标圆角（最短边的百分比，0 为方形）
    pub icon_corner_radius: u8,
    /// 设备名覆盖，为空时使用主机名
    pub device_name: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: String::new(),
            notification_limit: DEFAULT_NOTIFICATION_LIMIT,
            receive_enabled: true,
            forward_enabled: true,
            icon_forward_enabled: true,
            list_icon_enabled: true,
            persistent_status_enabled: true,
            icon_corner_radius: DEFAULT_ICON_CORNER_RADIUS,
            device_name: None,
        }
    }
}

impl Settings {
    /// 是否配置了服务器地址
    pub fn has_server(&self) -> bool {
        !self.server_address.trim().is_empty()
    }

    /// 是否需要处理图标（转发或列表显示任一开启）
    pub fn should_process_icons(&self) -> bool {
        self.icon_forward_enabled || self.list_icon_enabled
    }

    pub fn set_server_address(&mut self, address: &str) {
        self.server_address = format_server_address(address);
    }

    pub fn set_notification_limit(&mut self, limit: usize) {
        self.notification_limit = clamp_notification_limit(limit);
    }

    pub fn set_icon_corner_radius(&mut self, percent: u8) {
        self.icon_corner_radius = percent.min(MAX_ICON_CORNER_RADIUS);
    }

    /// 发送请求时使用的设备名
    pub fn resolved_device_name(&self) -> String {
        self.device_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(host_device_name)
    }

    /// 按 `key=value` 形式修改单个字段（CLI 使用）
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let parse_bool = |v: &str| match v.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" | "yes" => Ok(true),
            "false" | "off" | "0" | "no" => Ok(false),
            _ => Err(invalid()),
        };

        match key {
            "server_address" => self.set_server_address(value),
            "notification_limit" => {
                let limit: usize = value.trim().parse().map_err(|_| invalid())?;
                self.set_notification_limit(limit);
            }
            "receive_enabled" => self.receive_enabled = parse_bool(value)?,
            "forward_enabled" => self.forward_enabled = parse_bool(value)?,
            "icon_forward_enabled" => self.icon_forward_enabled = parse_bool(value)?,
            "list_icon_enabled" => self.list_icon_enabled = parse_bool(value)?,
            "persistent_status_enabled" => self.persistent_status_enabled = parse_bool(value)?,
            "icon_corner_radius" => {
                let percent: u8 = value.trim().parse().map_err(|_| invalid())?;
                self.set_icon_corner_radius(percent);
            }
            "device_name" => {
                let name = value.trim();
                self.device_name = (!name.is_empty()).then(|| name.to_string());
            }
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// 修正文件中可能越界的值
    fn normalized(mut self) -> Self {
        self.notification_limit = clamp_notification_limit(self.notification_limit);
        self.icon_corner_radius = self.icon_corner_radius.min(MAX_ICON_CORNER_RADIUS);
        self
    }
}

/// 历史上限限制在 [1, 10000]
pub fn clamp_notification_limit(limit: usize) -> usize {
    limit.clamp(MIN_NOTIFICATION_LIMIT, MAX_NOTIFICATION_LIMIT)
}

/// 主机名作为设备名
pub fn host_device_name() -> String {
    sysinfo::System::host_name()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// 默认配置文件路径
pub fn default_settings_path() -> Result<PathBuf, SettingsError> {
    let home = dirs::home_dir().ok_or(SettingsError::NoConfigDir)?;
    Ok(home
        .join(".config")
        .join("notify-forwarders")
        .join("settings.json"))
}

/// 从文件加载配置，文件不存在时返回默认值
pub fn load_from(path: &Path) -> Result<Settings, SettingsError> {
    if !path.exists() {
        debug!(path = %path.display(), "Settings file not found, using defaults");
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings: Settings = serde_json::from_str(&content)?;
    Ok(settings.normalized())
}

/// 写入配置（带文件锁，原子替换）
pub fn save_to(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    use fs2::FileExt;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let lock_path = path.with_extension("lock");
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)?;
    lock.lock_exclusive()?;

    let temp_path = path.with_extension("tmp");
    let result = (|| -> Result<(), SettingsError> {
        let mut temp = File::create(&temp_path)?;
        temp.write_all(serde_json::to_string_pretty(settings)?.as_bytes())?;
        temp.sync_all()?;
        fs::rename(&temp_path, path)?;
        Ok(())
    })();

    lock.unlock()?;
    result
}

/// 进程内共享的配置句柄
///
/// 组件持有 clone，读取时拿快照；写入时如有备份文件则同步落盘。
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    inner: Arc<RwLock<Settings>>,
    path: Option<PathBuf>,
}

impl SettingsHandle {
    /// 纯内存配置（测试和嵌入场景）
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings.normalized())),
            path: None,
        }
    }

    /// 从文件加载并绑定该文件
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let settings = load_from(&path)?;
        Ok(Self {
            inner: Arc::new(RwLock::new(settings)),
            path: Some(path),
        })
    }

    /// 打开默认位置的配置
    pub fn open_default() -> Result<Self, SettingsError> {
        Self::open(default_settings_path()?)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 当前配置快照
    pub fn snapshot(&self) -> Settings {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 修改配置并持久化
    pub fn update<F>(&self, f: F) -> Result<Settings, SettingsError>
    where
        F: FnOnce(&mut Settings) -> Result<(), SettingsError>,
    {
        // 持有写锁直到落盘完成，保存失败时内存中的配置保持不变
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut next = guard.clone();
        f(&mut next)?;
        let next = next.normalized();

        if let Some(path) = &self.path {
            if let Err(e) = save_to(path, &next) {
                warn!(path = %path.display(), error = %e, "Failed to persist settings");
                return Err(e);
            }
        }
        *guard = next.clone();
        Ok(next)
    }

    pub fn save_server_address(&self, address: &str) -> Result<Settings, SettingsError> {
        self.update(|s| {
            s.set_server_address(address);
            Ok(())
        })
    }

    pub fn save_notification_limit(&self, limit: usize) -> Result<Settings, SettingsError> {
        self.update(|s| {
            s.set_notification_limit(limit);
            Ok(())
        })
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::in_memory(Settings::default())
    }
}
