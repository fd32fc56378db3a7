//! Timestamp helpers

use chrono::{NaiveDate, Utc};

/// Today's date in UTC
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Parse an ISO `YYYY-MM-DD` date (or the date prefix of an ISO timestamp)
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let prefix = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Format a duration in seconds as a short human string ("1h 05m", "42s")
pub fn format_eta(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
