use chrono::Utc;

/// Milliseconds since the unix epoch, stamped on node events.
pub fn time_millis() -> i64 {
    Utc::now().timestamp_millis()
}
