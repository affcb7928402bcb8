//! 有界通知历史
//!
//! 新记录插在头部，超出容量从尾部淘汰。相同 `unique_id` 的记录视为更新：
//! 旧的删除，新的放到最前面。变更通过 broadcast 通知观察者。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use tokio::sync::broadcast;
use tracing::debug;

use crate::capture::record::NotificationRecord;
use crate::settings::clamp_notification_limit;

/// 历史变更事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Inserted { unique_id: String },
    Evicted { count: usize },
    Cleared,
}

/// 通知历史
pub struct EventStore {
    records: RwLock<VecDeque<NotificationRecord>>,
    capacity: AtomicUsize,
    changes: broadcast::Sender<StoreEvent>,
}

impl EventStore {
    pub fn new(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity: AtomicUsize::new(clamp_notification_limit(capacity)),
            changes,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::SeqCst)
    }

    /// 调整容量，变小时立即淘汰尾部
    pub fn set_capacity(&self, capacity: usize) {
        let capacity = clamp_notification_limit(capacity);
        if self.capacity.swap(capacity, Ordering::SeqCst) == capacity {
            return;
        }
        let evicted = {
            let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
            truncate(&mut records, capacity)
        };
        self.emit_evicted(evicted);
    }

    /// 插入到头部
    pub fn insert(&self, record: NotificationRecord) {
        let unique_id = record.unique_id.clone();
        let evicted = {
            let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
            if let Some(pos) = records.iter().position(|r| r.unique_id == unique_id) {
                records.remove(pos);
                debug!(unique_id = %unique_id, "Replacing updated notification");
            }
            records.push_front(record);
            truncate(&mut records, self.capacity())
        };

        let _ = self.changes.send(StoreEvent::Inserted { unique_id });
        self.emit_evicted(evicted);
    }

    pub fn clear(&self) {
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        let _ = self.changes.send(StoreEvent::Cleared);
    }

    /// 当前历史快照（最新在前）
    pub fn snapshot(&self) -> Vec<NotificationRecord> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 订阅变更
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.changes.subscribe()
    }

    fn emit_evicted(&self, count: usize) {
        if count > 0 {
            debug!(count, "Evicted old notifications");
            let _ = self.changes.send(StoreEvent::Evicted { count });
        }
    }
}

fn truncate(records: &mut VecDeque<NotificationRecord>, capacity: usize) -> usize {
    let over = records.len().saturating_sub(capacity);
    records.truncate(capacity);
    over
}
