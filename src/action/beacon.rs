//! 常驻状态
//!
//! 三态：空闲 / 正在发送剪贴板 / 正在发送图片。只由编排器写入，
//! 是否启用由调用方根据配置判断，这里不感知开关。两个任务同时运行时后写者生效。

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    #[default]
    Idle,
    SendingClipboard,
    SendingImage,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Idle => write!(f, "idle"),
            TaskState::SendingClipboard => write!(f, "sending clipboard"),
            TaskState::SendingImage => write!(f, "sending image"),
        }
    }
}

/// 状态变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: TaskState,
    pub to: TaskState,
}

pub struct StatusBeacon {
    state: RwLock<TaskState>,
    transitions: broadcast::Sender<Transition>,
    current: watch::Sender<TaskState>,
}

impl StatusBeacon {
    pub fn new() -> Self {
        let (transitions, _) = broadcast::channel(32);
        let (current, _) = watch::channel(TaskState::Idle);
        Self {
            state: RwLock::new(TaskState::Idle),
            transitions,
            current,
        }
    }

    pub fn get(&self) -> TaskState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// 写入新状态，返回旧状态
    pub fn set(&self, to: TaskState) -> TaskState {
        let from = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *state, to)
        };
        if from != to {
            debug!(from = %from, to = %to, "Status changed");
            let _ = self.transitions.send(Transition { from, to });
            self.current.send_replace(to);
        }
        from
    }

    pub fn reset(&self) -> TaskState {
        self.set(TaskState::Idle)
    }

    /// 订阅每一次状态变化
    pub fn subscribe(&self) -> broadcast::Receiver<Transition> {
        self.transitions.subscribe()
    }

    /// 只关心最新状态的观察者使用
    pub fn watch(&self) -> watch::Receiver<TaskState> {
        self.current.subscribe()
    }

    /// 常驻通知上显示的状态文本
    pub fn status_text(&self, settings: &Settings, listener_active: bool) -> String {
        match self.get() {
            TaskState::SendingClipboard => "Sending clipboard…".to_string(),
            TaskState::SendingImage => "Sending image…".to_string(),
            TaskState::Idle => {
                let receiving = if settings.receive_enabled && listener_active {
                    "on"
                } else {
                    "off"
                };
                let forwarding = if !settings.has_server() {
                    "not configured"
                } else if settings.forward_enabled {
                    "on"
                } else {
                    "off"
                };
                format!("Receiving: {} | Forwarding: {}", receiving, forwarding)
            }
        }
    }
}

impl Default for StatusBeacon {
    fn default() -> Self {
        Self::new()
    }
}
