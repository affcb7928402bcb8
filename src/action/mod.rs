//! 按需任务
//!
//! - `orchestrator` - 单飞、期限、清理
//! - `beacon` - 常驻状态
//! - `notice` - 用户提示与投递

pub mod beacon;
pub mod notice;
pub mod orchestrator;

pub use beacon::{StatusBeacon, TaskState, Transition};
pub use notice::{Notice, NoticeAction, NoticeLevel, NoticePump, NoticeSender};
pub use orchestrator::{ActionOrchestrator, TaskKind, TaskOutcome, TASK_DEADLINE};
