//! 桌面宿主的协作者实现
//!
//! 命令行没有真正的系统剪贴板/媒体库/通知监听，这里用文件和 stdin 代替。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine;
use tracing::{debug, info};

use crate::action::notice::{Notice, NoticeLevel};
use crate::host::{
    ClipboardContent, ClipboardReader, IconSource, ImageContent, ListenerControl, MediaIndex,
    UserNotifier,
};

/// 把提示打印到 stderr
#[derive(Debug, Default)]
pub struct StderrNotifier;

impl UserNotifier for StderrNotifier {
    fn notify(&self, notice: Notice) {
        let mark = match notice.level {
            NoticeLevel::Info => "·",
            NoticeLevel::Success => "✓",
            NoticeLevel::Error => "✗",
        };
        if notice.title.is_empty() {
            eprintln!("{} {}", mark, notice.message);
        } else {
            eprintln!("{} {}: {}", mark, notice.title, notice.message);
        }
        if let Some(action) = notice.action {
            eprintln!("  → {:?}", action);
        }
    }
}

/// 内容固定的剪贴板
#[derive(Debug, Clone)]
pub struct FixedClipboard {
    content: ClipboardContent,
}

impl FixedClipboard {
    pub fn text(text: &str) -> Self {
        Self {
            content: ClipboardContent::text(text),
        }
    }

    pub fn image_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self {
            content: ClipboardContent::image(&bytes, mime_type_for(path)),
        })
    }

    pub fn empty() -> Self {
        Self {
            content: ClipboardContent::empty(),
        }
    }
}

impl ClipboardReader for FixedClipboard {
    fn read(&self, foreground: bool) -> Result<ClipboardContent> {
        debug!(foreground, "Reading fixed clipboard");
        Ok(self.content.clone())
    }
}

/// 只有一张图片的媒体库
#[derive(Debug, Clone, Default)]
pub struct SingleFileMedia {
    path: Option<PathBuf>,
}

impl SingleFileMedia {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

impl MediaIndex for SingleFileMedia {
    fn has_media_permission(&self) -> bool {
        self.path
            .as_deref()
            .map_or(true, |p| fs::metadata(p).is_ok())
    }

    fn latest_image(&self) -> Result<Option<ImageContent>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        image_from_file(path).map(Some)
    }
}

/// 读取图片文件及其元数据
pub fn image_from_file(path: &Path) -> Result<ImageContent> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let metadata = fs::metadata(path)?;
    let to_secs = |t: std::io::Result<std::time::SystemTime>| {
        t.ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
    };

    Ok(ImageContent {
        content: base64::engine::general_purpose::STANDARD.encode(&bytes),
        mime_type: mime_type_for(path),
        file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        file_path: Some(path.display().to_string()),
        date_added: to_secs(metadata.created()),
        date_modified: to_secs(metadata.modified()),
    })
}

/// 按扩展名推断 MIME
pub fn mime_type_for(path: &Path) -> String {
    image::ImageFormat::from_path(path)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

/// 从目录读取 `<app_id>.png` 作为应用图标
#[derive(Debug, Clone)]
pub struct IconDir {
    dir: PathBuf,
}

impl IconDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl IconSource for IconDir {
    fn app_icon(&self, app_id: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(format!("{}.png", app_id));
        fs::read(&path).with_context(|| format!("No icon at {}", path.display()))
    }
}

/// stdin 事件流的“监听器”状态
#[derive(Debug)]
pub struct StdinListener {
    active: AtomicBool,
    pid: sysinfo::Pid,
}

impl StdinListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            active: AtomicBool::new(true),
            pid: sysinfo::Pid::from_u32(std::process::id()),
        })
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}

impl ListenerControl for StdinListener {
    fn is_listener_active(&self) -> Result<bool> {
        Ok(self.active.load(Ordering::SeqCst))
    }

    fn reregister_listener(&self) -> Result<()> {
        info!("Re-registering stdin listener");
        self.set_active(true);
        Ok(())
    }

    fn ensure_running(&self) -> Result<()> {
        let system = sysinfo::System::new_all();
        match system.process(self.pid) {
            Some(p) => {
                debug!(pid = %self.pid, memory = p.memory(), "Capture process running");
                Ok(())
            }
            None => anyhow::bail!("capture process {} not found", self.pid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("a.png")), "image/png");
        assert_eq!(mime_type_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("a.unknown")), "application/octet-stream");
    }

    #[test]
    fn test_image_from_file_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        fs::write(&path, [1u8, 2, 3]).unwrap();

        let image = image_from_file(&path).unwrap();
        assert_eq!(image.content, "AQID");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.file_name.as_deref(), Some("shot.png"));
        assert!(image.date_modified.is_some());
    }

    #[test]
    fn test_single_file_media() {
        assert!(SingleFileMedia::none().latest_image().unwrap().is_none());
        let missing = SingleFileMedia::new("/definitely/not/here.png");
        assert!(!missing.has_media_permission());
    }

    #[test]
    fn test_stdin_listener_reregister() {
        let listener = StdinListener::new();
        listener.set_active(false);
        assert!(!listener.is_listener_active().unwrap());
        listener.reregister_listener().unwrap();
        assert!(listener.is_listener_active().unwrap());
        assert!(listener.ensure_running().is_ok());
    }
}
