//! Output formatting for CLI commands

use serde::Serialize;

use crate::capture::format::{short_description, to_json_string};
use crate::capture::NotificationRecord;

/// Pretty JSON, or `key: value` lines for flat objects
pub fn format_output<T: Serialize>(data: &T, json: bool) -> String {
    let value = match serde_json::to_value(data) {
        Ok(v) => v,
        Err(_) => return "{}".to_string(),
    };
    if json {
        return serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string());
    }

    match value.as_object() {
        Some(map) => map
            .iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => format!("{}: {}", k, s),
                serde_json::Value::Null => format!("{}: -", k),
                other => format!("{}: {}", k, other),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        None => value.to_string(),
    }
}

/// 捕获结果：JSON 输出完整记录，否则一行摘要
pub fn format_record(record: &NotificationRecord, json: bool) -> String {
    if json {
        to_json_string(record)
    } else {
        short_description(record)
    }
}
