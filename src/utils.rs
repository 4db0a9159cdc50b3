use chrono::Utc;
use uuid::Uuid;

/// Seconds since the Unix epoch.
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// 生成一个随机唯一 ID
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Renders a timestamp from [`current_timestamp`] for display.
pub fn format_timestamp(secs: i64) -> String {
    match chrono::DateTime::from_timestamp(secs, 0) {
        Some(t) if secs > 0 => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        _ => "-".to_string(),
    }
}
