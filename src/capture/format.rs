//! 通知记录的展示格式

use chrono::{Local, TimeZone};
use serde_json::json;

use crate::capture::record::NotificationRecord;

/// 本地时间 `YYYY-MM-DD HH:MM:SS`
pub fn format_time(epoch_ms: i64) -> String {
    match Local.timestamp_millis_opt(epoch_ms).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => epoch_ms.to_string(),
    }
}

/// 带格式化时间的 JSON，图标字段只在存在时输出
pub fn to_json_string(record: &NotificationRecord) -> String {
    let mut value = json!({
        "id": record.sequence_id,
        "packageName": record.source_app_id,
        "appName": record.display_app_name,
        "title": record.title,
        "content": record.content,
        "time": record.posted_at_ms,
        "timeFormatted": format_time(record.posted_at_ms),
        "uniqueId": record.unique_id,
    });
    if let Some(map) = value.as_object_mut() {
        if let Some(checksum) = &record.icon_checksum {
            map.insert("iconMd5".into(), json!(checksum));
        }
        if let Some(payload) = &record.icon_payload {
            map.insert("iconBase64".into(), json!(payload));
        }
    }
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

/// 多行纯文本
pub fn to_plain_text(record: &NotificationRecord) -> String {
    let mut lines = vec![
        format!("App: {}", record.display_app_name),
        format!("Time: {}", format_time(record.posted_at_ms)),
    ];
    if !record.title.is_empty() {
        lines.push(format!("Title: {}", record.title));
    }
    if !record.content.is_empty() {
        lines.push(format!("Content: {}", record.content));
    }
    lines.push(format!("Package: {}", record.source_app_id));
    lines.join("\n")
}

/// 一行摘要：`应用: 标题`，没有标题时用正文
pub fn short_description(record: &NotificationRecord) -> String {
    if !record.title.is_empty() {
        format!("{}: {}", record.display_app_name, record.title)
    } else if !record.content.is_empty() {
        format!("{}: {}", record.display_app_name, record.content)
    } else {
        record.display_app_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::record::RawEvent;

    fn record(title: &str, content: &str) -> NotificationRecord {
        NotificationRecord::from_raw(
            &RawEvent::new("com.mail", title, content)
                .with_app_name("Mail")
                .with_id(9)
                .with_posted_at(1_700_000_000_000),
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_short_description() {
        assert_eq!(short_description(&record("Hi", "body")), "Mail: Hi");
        assert_eq!(short_description(&record("", "body")), "Mail: body");
    }

    #[test]
    fn test_plain_text_skips_empty_title() {
        let text = to_plain_text(&record("", "body"));
        assert!(text.starts_with("App: Mail\nTime: "));
        assert!(!text.contains("Title:"));
        assert!(text.contains("Content: body"));
        assert!(text.ends_with("Package: com.mail"));
    }

    #[test]
    fn test_json_has_icon_only_when_present() {
        let plain: serde_json::Value = serde_json::from_str(&to_json_string(&record("T", "C"))).unwrap();
        assert_eq!(plain["uniqueId"], "com.mail:9");
        assert_eq!(plain["timeFormatted"].as_str().unwrap().len(), 19);
        assert!(plain.get("iconMd5").is_none());

        let with_icon = record("T", "C").with_icon("abc".into(), "AAAA".into());
        let v: serde_json::Value = serde_json::from_str(&to_json_string(&with_icon)).unwrap();
        assert_eq!(v["iconMd5"], "abc");
        assert_eq!(v["iconBase64"], "AAAA");
    }

    #[test]
    fn test_format_time_shape() {
        let s = format_time(0);
        assert_eq!(s.len(), 19);
        assert_eq!(&s[4..5], "-");
        assert_eq!(&s[13..14], ":");
    }
}
