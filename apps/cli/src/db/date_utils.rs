//! Date utilities for daily reset hour handling.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use study_engine::session::format_date;
use study_engine::study_date;

/// Offset of the local time zone right now.
pub fn local_offset() -> FixedOffset {
    *Local::now().offset()
}

/// Get adjusted "today" based on daily_reset_hour.
///
/// Before the reset hour the study day is still the previous calendar day,
/// so late-night answers count towards it.
pub fn get_adjusted_today(daily_reset_hour: u32) -> NaiveDate {
    study_date(Utc::now(), local_offset(), daily_reset_hour)
}

/// Format adjusted today as YYYY-MM-DD string for SQL queries.
pub fn get_adjusted_today_string(daily_reset_hour: u32) -> String {
    study_day_string(Utc::now(), local_offset(), daily_reset_hour)
}

/// Study day containing `now` in `offset`, as YYYY-MM-DD.
pub fn study_day_string(now: DateTime<Utc>, offset: FixedOffset, daily_reset_hour: u32) -> String {
    format_date(study_date(now, offset, daily_reset_hour))
}
