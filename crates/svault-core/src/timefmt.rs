//! Human-readable timestamps for listings and the audit log
//! ("1st January, 2024", "1st January, 2024 - 3:05 PM").

use chrono::{DateTime, Datelike, Local, TimeZone};
use std::fmt::Display;

/// Current Unix time in seconds.
pub fn now_epoch() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Convert Unix seconds to local time (epoch start if out of range).
pub fn local(epoch: u64) -> DateTime<Local> {
    let secs = i64::try_from(epoch).unwrap_or(i64::MAX);
    DateTime::from_timestamp(secs, 0)
        .unwrap_or_default()
        .with_timezone(&Local)
}

fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

pub fn format_date<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    let day = dt.day();
    format!("{day}{} {}", ordinal_suffix(day), dt.format("%B, %Y"))
}

pub fn format_date_time<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!("{} - {}", format_date(dt), dt.format("%-I:%M %p"))
}
