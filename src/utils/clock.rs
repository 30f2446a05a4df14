use chrono::Utc;

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Current wall-clock time as fractional epoch seconds, the unit used by both
/// persisted file formats.
pub fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Whole epoch seconds, used for backup file names.
pub fn now_epoch() -> i64 {
    Utc::now().timestamp()
}
